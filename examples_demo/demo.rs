use call_trace_log::{get_logger, log_info, traced, Logger};
use serde_json::{json, Value};

#[derive(Debug)]
struct DemoError(&'static str);

impl std::fmt::Display for DemoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

fn raise_error() -> Result<(), DemoError> {
    Err(DemoError("Error!!!!"))
}

fn run(logger: &Logger) -> Result<(), DemoError> {
    let temp = traced!(logger, "temp" => |(data,): (Value,)| {
        log_info!(logger, "{}", data);
    });

    log_info!(logger, "{}", json!({"a": "c"}));
    temp.call((json!({"a": "b"}),));
    raise_error()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = get_logger()?;

    let main = traced!(logger, "main" => |(): ()| run(&logger));
    // The failure is logged as [EXCEPTION] and then returned here.
    if let Err(err) = main.try_call(()) {
        eprintln!("demo finished with error: {}", err);
    }
    Ok(())
}
