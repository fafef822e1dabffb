use call_trace_log::{get_logger_with_config, log, log_info, LoggerConfig, Target, WithKwargs};
use serde_json::json;
use std::fs;

// The global subscriber can be installed once per process, so the whole
// scenario lives in a single test.
#[test]
fn global_logger_writes_enriched_lines_once() {
    let path = std::env::temp_dir().join(format!("call-trace-log-global-{}.log", std::process::id()));
    let _ = fs::remove_file(&path);

    let config = LoggerConfig {
        file_path: path.clone(),
        console: false,
        ..LoggerConfig::default()
    };
    let logger = get_logger_with_config(config.clone()).unwrap();
    let again = get_logger_with_config(LoggerConfig {
        name: "ignored".to_string(),
        ..config
    })
    .unwrap();
    assert_eq!(logger, again);
    assert_eq!(again.name(), "call_trace_log");

    let f = log(&logger).wrap(Target::new("f", file!()), |(x,): (i32,)| x * 2);
    let call_line = line!() + 1;
    assert_eq!(f.call((21,)), 42);

    let g = log(&logger).wrap(Target::new("g", file!()), |call: WithKwargs<(i32,), serde_json::Value>| {
        call.args.0
    });
    assert_eq!(g.call(WithKwargs::new((1,), json!({"x": 2}))), 1);

    let direct_line = line!() + 1;
    log_info!(logger, "direct {}", "message");
    tracing::debug!("below threshold");
    tracing::warn!("from tracing");

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 6, "{}", contents);

    let site = format!("INFO\t{} - f:(21,):{} -> ", file!(), call_line);
    assert!(lines[0].contains(&site) && lines[0].ends_with("[START] f"), "{}", lines[0]);
    assert!(lines[1].contains(&site) && lines[1].ends_with("[END] f"), "{}", lines[1]);
    assert!(lines[2].contains(" - g:((1,), (1, {\"x\": 2})):"), "{}", lines[2]);
    assert!(
        lines[4].ends_with(&format!(
            "INFO\t{} - global_logger_writes_enriched_lines_once:():{} -> direct message",
            file!(),
            direct_line
        )),
        "{}",
        lines[4]
    );
    assert!(lines[5].contains("] WARNING\t") && lines[5].ends_with("-> from tracing"));
    assert!(lines.iter().all(|l| l.starts_with('[')));

    fs::remove_file(&path).unwrap();
}
