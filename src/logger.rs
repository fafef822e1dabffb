use crate::filter::UNKNOWN_FUNCTION;
use crate::record::CallSite;
use crate::severity::Severity;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Source location of a direct log statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub file: &'static str,
    pub line: u32,
    /// `None` when the caller's function cannot be known, e.g. for the
    /// `#[track_caller]` methods on [`Logger`].
    pub function: Option<&'static str>,
}

impl Origin {
    pub fn new(file: &'static str, line: u32, function: Option<&'static str>) -> Self {
        Self { file, line, function }
    }

    /// Location of the code calling the current `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line(), None)
    }
}

/// Cheap, cloneable handle that emits records through `tracing`.
///
/// The handle itself holds no sinks: whatever subscriber is active on the
/// current thread (normally the one installed by
/// [`get_logger`](crate::init::get_logger)) receives the events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    name: Arc<str>,
}

macro_rules! emit_event {
    ($severity:expr, $($rest:tt)+) => {
        match $severity {
            Severity::Debug => tracing::debug!($($rest)+),
            Severity::Info => tracing::info!($($rest)+),
            Severity::Warning => tracing::warn!($($rest)+),
            Severity::Error => tracing::error!($($rest)+),
            Severity::Critical => tracing::error!(severity = "CRITICAL", $($rest)+),
        }
    };
}

impl Logger {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[track_caller]
    pub fn log(&self, severity: Severity, message: impl fmt::Display) {
        self.log_at(severity, Origin::caller(), message);
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Severity::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Severity::Info, message);
    }

    #[track_caller]
    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Severity::Warning, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Severity::Error, message);
    }

    #[track_caller]
    pub fn critical(&self, message: impl fmt::Display) {
        self.log(Severity::Critical, message);
    }

    /// Emit a record attributed to an explicit source location.
    pub fn log_at(&self, severity: Severity, origin: Origin, message: impl fmt::Display) {
        emit_event!(
            severity,
            logger = &*self.name,
            origin.file = origin.file,
            origin.line = origin.line,
            origin.function = origin.function.unwrap_or(UNKNOWN_FUNCTION),
            "{}",
            message
        );
    }

    /// Emit a record carrying the metadata of a traced call.
    pub(crate) fn log_call(
        &self,
        severity: Severity,
        site: &CallSite<'_>,
        exception: Option<&str>,
        message: impl fmt::Display,
    ) {
        emit_event!(
            severity,
            logger = &*self.name,
            call.file = site.file,
            call.function = site.function,
            call.line = site.line,
            call.args = site.args,
            exception = exception,
            "{}",
            message
        );
    }
}

#[doc(hidden)]
pub fn trim_function_path(path: &'static str) -> &'static str {
    let path = path.strip_suffix("::__here").unwrap_or(path);
    path.rsplit("::")
        .find(|segment| *segment != "{{closure}}")
        .unwrap_or(path)
}

/// Name of the enclosing function, without its module path.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::logger::trim_function_path(__type_name_of(__here))
    }};
}

/// Log through a [`Logger`] with the file, line and enclosing function of
/// the macro call site.
///
/// ```ignore
/// log_event!(logger, Severity::Warning, "retrying {}", attempt);
/// ```
#[macro_export]
macro_rules! log_event {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger.log_at(
            $severity,
            $crate::logger::Origin::new(file!(), line!(), Some($crate::function_name!())),
            format_args!($($arg)+),
        )
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::severity::Severity::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::severity::Severity::Info, $($arg)+) };
}

#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::severity::Severity::Warning, $($arg)+) };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::severity::Severity::Error, $($arg)+) };
}

#[macro_export]
macro_rules! log_critical {
    ($logger:expr, $($arg:tt)+) => { $crate::log_event!($logger, $crate::severity::Severity::Critical, $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::CallSiteLayer;
    use crate::memory_sink::MemorySink;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    fn capture<F: FnOnce()>(f: F) -> Vec<String> {
        let sink = MemorySink::new();
        let layer = CallSiteLayer::new(Severity::Debug, vec![Arc::new(sink.clone())]);
        tracing::subscriber::with_default(Registry::default().with(layer), f);
        sink.lines()
    }

    #[test]
    fn methods_record_the_calling_line() {
        let logger = Logger::new("app");
        let line_no = line!() + 1;
        let lines = capture(|| logger.info("hello"));
        let expected = format!("INFO\t{} - {}:():{} -> hello", file!(), UNKNOWN_FUNCTION, line_no);
        assert!(lines[0].ends_with(&expected), "{}", lines[0]);
    }

    #[test]
    fn macros_record_the_enclosing_function() {
        let logger = Logger::new("app");
        let line_no = line!() + 1;
        let lines = capture(|| crate::log_warning!(logger, "disk at {}%", 91));
        let expected = format!(
            "WARNING\t{} - macros_record_the_enclosing_function:():{} -> disk at 91%",
            file!(),
            line_no
        );
        assert!(lines[0].ends_with(&expected), "{}", lines[0]);
    }

    #[test]
    fn every_severity_is_emitted() {
        let logger = Logger::new("app");
        let lines = capture(|| {
            logger.debug("d");
            logger.info("i");
            logger.warning("w");
            logger.error("e");
            logger.critical("c");
        });
        let severities: Vec<&str> = lines
            .iter()
            .map(|l| l.split(']').nth(1).unwrap().trim_start().split('\t').next().unwrap())
            .collect();
        assert_eq!(severities, ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]);
    }

    #[test]
    fn function_name_strips_path_and_closures() {
        assert_eq!(function_name!(), "function_name_strips_path_and_closures");
        let from_closure = (|| function_name!())();
        assert_eq!(from_closure, "function_name_strips_path_and_closures");
        assert_eq!(trim_function_path("a::b::run::{{closure}}::__here"), "run");
    }
}
