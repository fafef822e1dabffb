use crate::severity::Severity;
use chrono::{DateTime, Local};

/// Names of the `tracing` fields this crate reads and writes on events.
///
/// `call.*` fields are supplied by the call-tracing wrapper; `origin.*`
/// fields are the emitting site recorded by a [`Logger`](crate::logger::Logger)
/// handle. Events carrying neither fall back to the event metadata.
pub mod fields {
    pub const MESSAGE: &str = "message";
    pub const SEVERITY: &str = "severity";
    pub const LOGGER: &str = "logger";
    pub const EXCEPTION: &str = "exception";

    pub const CALL_FILE: &str = "call.file";
    pub const CALL_FUNCTION: &str = "call.function";
    pub const CALL_LINE: &str = "call.line";
    pub const CALL_ARGS: &str = "call.args";

    pub const ORIGIN_FILE: &str = "origin.file";
    pub const ORIGIN_FUNCTION: &str = "origin.function";
    pub const ORIGIN_LINE: &str = "origin.line";
}

/// Call-site metadata attached by the tracing wrapper to each of its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite<'a> {
    pub file: &'a str,
    pub function: &'a str,
    pub line: u32,
    pub args: &'a str,
}

/// A fully enriched record, ready to be formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub function: String,
    pub line: u32,
    pub args: String,
    pub logger: Option<String>,
    /// Failure detail printed after the line of an `[EXCEPTION]` record.
    pub exception: Option<String>,
}
