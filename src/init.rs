use crate::env::{env_opt, env_or, parse_bool, LOG_CONSOLE_ENV, LOG_FILE_ENV, LOG_LEVEL_ENV};
use crate::error::{ConfigError, InitError};
use crate::layer::CallSiteLayer;
use crate::logger::Logger;
use crate::severity::Severity;
use crate::sink::{ConsoleSink, FileSink, LineSink};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

pub const DEFAULT_LOG_FILE: &str = "test.log";
pub const DEFAULT_LOGGER_NAME: &str = "call_trace_log";

/// Configuration of the logger factory.
///
/// **Fields**
/// - `file_path`: destination for persisted log lines, opened in
///   append/create mode.
/// - `min_severity`: lowest [`Severity`] written to any sink.
/// - `console`: if `true`, every line is also written to stderr with the
///   same format and threshold.
/// - `name`: identity of the returned [`Logger`] handle.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub file_path: PathBuf,
    pub min_severity: Severity,
    pub console: bool,
    pub name: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_LOG_FILE),
            min_severity: Severity::Info,
            console: true,
            name: DEFAULT_LOGGER_NAME.to_string(),
        }
    }
}

impl LoggerConfig {
    /// Defaults overlaid with [`LOG_FILE_ENV`], [`LOG_LEVEL_ENV`] and
    /// [`LOG_CONSOLE_ENV`] when they are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = LoggerConfig {
            file_path: PathBuf::from(env_or(LOG_FILE_ENV, DEFAULT_LOG_FILE)),
            ..LoggerConfig::default()
        };

        if let Some(level) = env_opt(LOG_LEVEL_ENV) {
            config.min_severity = level.parse().map_err(|source| ConfigError::Severity {
                key: LOG_LEVEL_ENV,
                source,
            })?;
        }
        if let Some(console) = env_opt(LOG_CONSOLE_ENV) {
            config.console = parse_bool(&console).ok_or(ConfigError::Bool {
                key: LOG_CONSOLE_ENV,
                value: console,
            })?;
        }

        Ok(config)
    }
}

/// Build the layer described by `config` without installing it.
///
/// Opens (or creates) the log file; adds a [`ConsoleSink`] when
/// `config.console` is set. Useful for composing with other layers or for
/// scoped subscribers in tests.
pub fn build_layer(config: &LoggerConfig) -> Result<CallSiteLayer, InitError> {
    let file = FileSink::open(&config.file_path).map_err(|source| InitError::OpenFile {
        path: config.file_path.clone(),
        source,
    })?;

    let mut sinks: Vec<Arc<dyn LineSink>> = vec![Arc::new(file)];
    if config.console {
        sinks.push(Arc::new(ConsoleSink));
    }

    Ok(CallSiteLayer::new(config.min_severity, sinks))
}

static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Install the global subscriber described by `config` and return the
/// logger handle.
///
/// **Effects**
///
/// The first successful call installs a [`Registry`] combined with a
/// [`CallSiteLayer`] as the global default subscriber, so all `tracing`
/// events in the process are written to the configured sinks. Later calls
/// return a clone of the same handle and ignore `config`; sinks are never
/// attached twice.
///
/// **Errors**
/// - [`InitError::OpenFile`] if the log file cannot be opened.
/// - [`InitError::SubscriberAlreadySet`] if some other global subscriber
///   was installed first.
pub fn get_logger_with_config(config: LoggerConfig) -> Result<Logger, InitError> {
    if let Some(logger) = GLOBAL_LOGGER.get() {
        return Ok(logger.clone());
    }

    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(logger) = GLOBAL_LOGGER.get() {
        return Ok(logger.clone());
    }

    let layer = build_layer(&config)?;
    tracing::subscriber::set_global_default(Registry::default().with(layer))?;

    let logger = GLOBAL_LOGGER.get_or_init(|| Logger::new(config.name));
    Ok(logger.clone())
}

/// Install the global subscriber with [`LoggerConfig::default`]: INFO and
/// above, written to `test.log` and stderr.
pub fn get_logger() -> Result<Logger, InitError> {
    get_logger_with_config(LoggerConfig::default())
}
