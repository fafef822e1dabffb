use crate::record::LogRecord;

/// `asctime`-style timestamp: local time with milliseconds after a comma.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Render a record as
/// `[<timestamp>] <SEVERITY>\t<file> - <function>:<args>:<line> -> <message>`.
///
/// The exception detail of an `[EXCEPTION]` record follows on the next
/// line(s). No trailing newline; sinks add it.
pub fn format_line(record: &LogRecord) -> String {
    let mut line = format!(
        "[{}] {}\t{} - {}:{}:{} -> {}",
        record.timestamp.format(TIMESTAMP_FORMAT),
        record.severity,
        record.file,
        record.function,
        record.args,
        record.line,
        record.message,
    );
    if let Some(detail) = &record.exception {
        line.push('\n');
        line.push_str(detail);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use chrono::{Local, TimeZone};

    fn record() -> LogRecord {
        LogRecord {
            timestamp: Local.with_ymd_and_hms(2024, 5, 17, 9, 3, 7).unwrap(),
            severity: Severity::Info,
            message: "[START] f".to_string(),
            file: "src/main.rs".to_string(),
            function: "f".to_string(),
            line: 42,
            args: "(21,)".to_string(),
            logger: None,
            exception: None,
        }
    }

    #[test]
    fn renders_fixed_template() {
        assert_eq!(
            format_line(&record()),
            "[2024-05-17 09:03:07,000] INFO\tsrc/main.rs - f:(21,):42 -> [START] f"
        );
    }

    #[test]
    fn appends_exception_detail() {
        let mut record = record();
        record.severity = Severity::Error;
        record.message = "[EXCEPTION] f boom".to_string();
        record.exception = Some("Custom { kind: Other, error: \"boom\" }".to_string());
        let line = format_line(&record);
        let mut lines = line.lines();
        assert!(lines.next().unwrap().ends_with("ERROR\tsrc/main.rs - f:(21,):42 -> [EXCEPTION] f boom"));
        assert_eq!(lines.next(), Some("Custom { kind: Other, error: \"boom\" }"));
    }
}
