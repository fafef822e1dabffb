//! Environment variable names used by this crate for convenient
//! configuration of the logger factory.
//!
//! These are purely helpers; [`LoggerConfig`](crate::init::LoggerConfig)
//! itself stays a plain value and the factory never reads the environment
//! on its own.

/// Destination file for persisted log lines.
pub const LOG_FILE_ENV: &str = "CALL_TRACE_LOG_FILE";

/// Lowest severity written, e.g. `INFO`, `warning`.
pub const LOG_LEVEL_ENV: &str = "CALL_TRACE_LOG_LEVEL";

/// Whether lines are mirrored to stderr (`true`/`false`, `1`/`0`, `yes`/`no`).
pub const LOG_CONSOLE_ENV: &str = "CALL_TRACE_LOG_CONSOLE";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and empty as absent.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a boolean switch as written in environment variables.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
