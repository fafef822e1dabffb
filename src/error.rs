use std::path::PathBuf;

/// Error type returned when a severity name cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown severity `{0}`")]
pub struct ParseSeverityError(pub String);

/// Error type returned when building a [`LoggerConfig`](crate::init::LoggerConfig)
/// from the environment.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {source}")]
    Severity {
        key: &'static str,
        #[source]
        source: ParseSeverityError,
    },

    #[error("invalid boolean for {key}: `{value}`")]
    Bool { key: &'static str, value: String },
}

/// Error type returned by the logger factory.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("cannot open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("another global tracing subscriber is already installed")]
    SubscriberAlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}
