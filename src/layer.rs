use crate::filter::{enrich, RawRecord, SiteFields};
use crate::format::format_line;
use crate::record::fields;
use crate::severity::Severity;
use crate::sink::LineSink;
use chrono::Local;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that enriches every event with call-site
/// metadata, formats it as a single line and writes it to each sink.
///
/// Events below `min_severity` are ignored. Writes happen inline on the
/// emitting thread; a failing sink is reported on stderr and skipped.
pub struct CallSiteLayer {
    min_severity: Severity,
    sinks: Vec<Arc<dyn LineSink>>,
}

impl CallSiteLayer {
    pub fn new(min_severity: Severity, sinks: Vec<Arc<dyn LineSink>>) -> Self {
        Self { min_severity, sinks }
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl<S> Layer<S> for CallSiteLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let severity = visitor
            .severity
            .unwrap_or_else(|| Severity::from(*meta.level()));
        if severity < self.min_severity {
            return;
        }

        // The module path only stands in for the function of raw `tracing`
        // events; a recorded origin without a function stays unknown.
        let has_origin = visitor.origin.file.is_some() || visitor.origin.line.is_some();
        let from_metadata = SiteFields {
            file: meta.file().map(str::to_string),
            function: meta.module_path().filter(|_| !has_origin).map(str::to_string),
            line: meta.line(),
            args: None,
        };

        let mut message = visitor.message.unwrap_or_default();
        if !visitor.extra.is_empty() {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(&visitor.extra.join(" "));
        }

        let record = enrich(RawRecord {
            timestamp: Local::now(),
            severity,
            message,
            logger: visitor.logger,
            exception: visitor.exception,
            call: visitor.call,
            intrinsic: visitor.origin.or(from_metadata),
        });
        let line = format_line(&record);

        for sink in &self.sinks {
            if let Err(e) = sink.write_line(&line) {
                eprintln!("error writing log line: {}", e);
            }
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    severity: Option<Severity>,
    logger: Option<String>,
    exception: Option<String>,
    call: SiteFields,
    origin: SiteFields,
    /// Fields this crate does not know, rendered `name=value`.
    extra: Vec<String>,
}

impl FieldVisitor {
    fn set_text(&mut self, field: &Field, value: String) {
        match field.name() {
            fields::MESSAGE => self.message = Some(value),
            fields::SEVERITY => match value.parse() {
                Ok(severity) => self.severity = Some(severity),
                Err(_) => self.extra.push(format!("{}={}", fields::SEVERITY, value)),
            },
            fields::LOGGER => self.logger = Some(value),
            fields::EXCEPTION => self.exception = Some(value),
            fields::CALL_FILE => self.call.file = Some(value),
            fields::CALL_FUNCTION => self.call.function = Some(value),
            fields::CALL_ARGS => self.call.args = Some(value),
            fields::ORIGIN_FILE => self.origin.file = Some(value),
            fields::ORIGIN_FUNCTION => self.origin.function = Some(value),
            name => self.extra.push(format!("{}={}", name, value)),
        }
    }

    fn set_number(&mut self, field: &Field, value: u64) {
        let line = u32::try_from(value).ok();
        match field.name() {
            fields::CALL_LINE if line.is_some() => self.call.line = line,
            fields::ORIGIN_LINE if line.is_some() => self.origin.line = line,
            _ => self.set_text(field, value.to_string()),
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_text(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match u64::try_from(value) {
            Ok(v) => self.set_number(field, v),
            Err(_) => self.set_text(field, value.to_string()),
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.set_number(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.set_text(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(buf, "{:?}", value);
        self.set_text(field, buf);
    }
}
