//! Record enrichment.
//!
//! Every record leaving [`enrich`] carries a source file, function name,
//! line number and argument payload: the values supplied by the tracing
//! wrapper when present, the record's own values otherwise. Nothing is ever
//! dropped here; severity gating happens in the layer.

use crate::record::LogRecord;
use crate::severity::Severity;
use chrono::{DateTime, Local};

pub const UNKNOWN_FILE: &str = "(unknown file)";
pub const UNKNOWN_FUNCTION: &str = "(unknown function)";
/// Argument payload of a record that was not produced by a traced call.
pub const NO_ARGS: &str = "()";

/// One source of call-site values. Any slot may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteFields {
    pub file: Option<String>,
    pub function: Option<String>,
    pub line: Option<u32>,
    pub args: Option<String>,
}

impl SiteFields {
    /// Fill the missing slots of `self` from `fallback`.
    pub fn or(self, fallback: SiteFields) -> SiteFields {
        SiteFields {
            file: self.file.or(fallback.file),
            function: self.function.or(fallback.function),
            line: self.line.or(fallback.line),
            args: self.args.or(fallback.args),
        }
    }
}

/// A record as observed on the event, before enrichment.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
    pub logger: Option<String>,
    pub exception: Option<String>,
    /// Supplied by the tracing wrapper.
    pub call: SiteFields,
    /// The record's own attributes.
    pub intrinsic: SiteFields,
}

pub fn enrich(raw: RawRecord) -> LogRecord {
    let site = raw.call.or(raw.intrinsic);
    LogRecord {
        timestamp: raw.timestamp,
        severity: raw.severity,
        message: raw.message,
        file: non_empty(site.file).unwrap_or_else(|| UNKNOWN_FILE.to_string()),
        function: non_empty(site.function).unwrap_or_else(|| UNKNOWN_FUNCTION.to_string()),
        line: site.line.unwrap_or(0),
        args: non_empty(site.args).unwrap_or_else(|| NO_ARGS.to_string()),
        logger: raw.logger,
        exception: raw.exception,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
