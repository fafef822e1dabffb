//! Call tracing.
//!
//! [`log`] turns a [`Logger`] into a [`Decorator`]; wrapping a function with
//! it yields a [`Traced`] whose calls emit, through that logger:
//!
//! 1. `INFO  [START] <name>` before the target runs;
//! 2. `ERROR [EXCEPTION] <name> <message>` if the target returns `Err` or
//!    panics, with the error's `Debug` rendering (or the panic message and,
//!    when `RUST_BACKTRACE` enables it, a backtrace) as detail;
//! 3. `INFO  [END] <name>` afterwards, on every path including unwinding
//!    and dropping an unfinished future.
//!
//! Each record carries the target's file and name, the line of the code that
//! invoked the traced call and the rendered [`CallArgs`](crate::args::CallArgs).
//!
//! Failures are propagated by [`Traced::call`] and [`Traced::try_call`] after
//! being logged. [`Traced::call_or_none`] and [`Traced::try_call_or_none`]
//! swallow them instead and return `None`.
//!
//! ```ignore
//! let logger = get_logger()?;
//! let double = traced!(logger, "double" => |(x,): (i32,)| x * 2);
//! assert_eq!(double.call((21,)), 42);
//! ```

use crate::args::ToCallArgs;
use crate::logger::Logger;
use crate::record::CallSite;
use crate::severity::Severity;
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe, Location};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Identity of a traced function, reflected by its wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: Cow<'static, str>,
    file: Cow<'static, str>,
}

impl Target {
    pub fn new(name: impl Into<Cow<'static, str>>, file: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &str {
        &self.file
    }
}

/// Wraps functions so that their calls are traced through one logger.
#[derive(Debug, Clone)]
pub struct Decorator {
    logger: Logger,
}

/// Build a [`Decorator`] emitting through `logger`.
pub fn log(logger: &Logger) -> Decorator {
    Decorator {
        logger: logger.clone(),
    }
}

impl Decorator {
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn wrap<F>(&self, target: Target, f: F) -> Traced<F> {
        Traced {
            logger: self.logger.clone(),
            target,
            f,
        }
    }
}

/// A function wrapped by a [`Decorator`].
///
/// The target receives its arguments as a single value, usually a tuple;
/// that value's [`ToCallArgs`] rendering is what gets logged.
#[derive(Clone)]
pub struct Traced<F> {
    logger: Logger,
    target: Target,
    f: F,
}

impl<F> fmt::Debug for Traced<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traced")
            .field("logger", &self.logger)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<F> Traced<F> {
    pub fn name(&self) -> &str {
        self.target.name()
    }

    pub fn file(&self) -> &str {
        self.target.file()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn inner(&self) -> &F {
        &self.f
    }

    /// Emit `[START]` and return the guard that emits `[END]` on drop.
    fn begin<A: ToCallArgs>(&self, args: &A, caller: &'static Location<'static>) -> Invocation<'_> {
        let invocation = Invocation {
            logger: &self.logger,
            file: self.target.file(),
            function: self.target.name(),
            line: caller.line(),
            args: args.to_call_args().to_string(),
        };
        invocation.emit(Severity::Info, None, format_args!("[START] {}", invocation.function));
        invocation
    }

    /// Call the target, logging a panic before resuming it.
    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
        A: ToCallArgs,
    {
        let invocation = self.begin(&args, Location::caller());
        invocation.guard(|| (self.f)(args))
    }

    /// Call a fallible target, logging `Err` and panics before propagating
    /// them unchanged.
    #[track_caller]
    pub fn try_call<A, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        A: ToCallArgs,
        E: fmt::Display + fmt::Debug,
    {
        let invocation = self.begin(&args, Location::caller());
        match panic::catch_unwind(AssertUnwindSafe(|| (self.f)(args))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                invocation.failed(&err);
                Err(err)
            }
            Err(payload) => {
                invocation.panicked(&*payload);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Call the target; a panic is logged and swallowed, yielding `None`.
    ///
    /// State shared with the target may be left half-updated by the panic.
    #[track_caller]
    pub fn call_or_none<A, R>(&self, args: A) -> Option<R>
    where
        F: Fn(A) -> R,
        A: ToCallArgs,
    {
        let invocation = self.begin(&args, Location::caller());
        match panic::catch_unwind(AssertUnwindSafe(|| (self.f)(args))) {
            Ok(value) => Some(value),
            Err(payload) => {
                invocation.panicked(&*payload);
                None
            }
        }
    }

    /// Call a fallible target; `Err` and panics are logged and swallowed,
    /// yielding `None`.
    #[track_caller]
    pub fn try_call_or_none<A, T, E>(&self, args: A) -> Option<T>
    where
        F: Fn(A) -> Result<T, E>,
        A: ToCallArgs,
        E: fmt::Display + fmt::Debug,
    {
        let invocation = self.begin(&args, Location::caller());
        match panic::catch_unwind(AssertUnwindSafe(|| (self.f)(args))) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                invocation.failed(&err);
                None
            }
            Err(payload) => {
                invocation.panicked(&*payload);
                None
            }
        }
    }

    /// Call an async target. `[START]` is emitted immediately, `[END]` when
    /// the returned future completes or is dropped. Panics while building or
    /// polling the future are logged and resumed.
    #[track_caller]
    pub fn call_async<A, Fut>(&self, args: A) -> TracedFuture<'_, Fut>
    where
        F: Fn(A) -> Fut,
        Fut: Future,
        A: ToCallArgs,
    {
        let invocation = self.begin(&args, Location::caller());
        let fut = invocation.guard(|| (self.f)(args));
        TracedFuture::new(invocation, fut, |_, _| {})
    }

    /// Async counterpart of [`Traced::try_call`].
    #[track_caller]
    pub fn try_call_async<A, Fut, T, E>(&self, args: A) -> TracedFuture<'_, Fut>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        A: ToCallArgs,
        E: fmt::Display + fmt::Debug,
    {
        let invocation = self.begin(&args, Location::caller());
        let fut = invocation.guard(|| (self.f)(args));
        TracedFuture::new(invocation, fut, |invocation, output| {
            if let Err(err) = output {
                invocation.failed(err);
            }
        })
    }
}

/// One traced call in flight. Emits `[END]` when dropped.
struct Invocation<'a> {
    logger: &'a Logger,
    file: &'a str,
    function: &'a str,
    line: u32,
    args: String,
}

impl Invocation<'_> {
    fn site(&self) -> CallSite<'_> {
        CallSite {
            file: self.file,
            function: self.function,
            line: self.line,
            args: &self.args,
        }
    }

    fn emit(&self, severity: Severity, exception: Option<&str>, message: fmt::Arguments<'_>) {
        self.logger.log_call(severity, &self.site(), exception, message);
    }

    fn failed<E: fmt::Display + fmt::Debug>(&self, err: &E) {
        let detail = format!("{:?}", err);
        self.emit(
            Severity::Error,
            Some(&detail),
            format_args!("[EXCEPTION] {} {}", self.function, err),
        );
    }

    fn panicked(&self, payload: &(dyn Any + Send)) {
        let message = panic_message(payload);
        let mut detail = format!("panicked: {}", message);
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            detail.push_str("\nstack backtrace:\n");
            detail.push_str(&backtrace.to_string());
        }
        self.emit(
            Severity::Error,
            Some(&detail),
            format_args!("[EXCEPTION] {} {}", self.function, message),
        );
    }

    /// Run the synchronous part of a call, logging a panic before resuming it.
    fn guard<R>(&self, f: impl FnOnce() -> R) -> R {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => value,
            Err(payload) => {
                self.panicked(&*payload);
                panic::resume_unwind(payload)
            }
        }
    }
}

impl Drop for Invocation<'_> {
    fn drop(&mut self) {
        self.emit(Severity::Info, None, format_args!("[END] {}", self.function));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "panic with non-string payload"
    }
}

/// Future returned by [`Traced::call_async`] and [`Traced::try_call_async`].
///
/// Polls the target inside `catch_unwind`; `[END]` is emitted on
/// completion, on panic (after `[EXCEPTION]`) or when dropped unfinished.
pub struct TracedFuture<'a, Fut: Future> {
    invocation: Option<Invocation<'a>>,
    inner: Pin<Box<Fut>>,
    inspect: fn(&Invocation<'_>, &Fut::Output),
}

impl<'a, Fut: Future> TracedFuture<'a, Fut> {
    fn new(invocation: Invocation<'a>, fut: Fut, inspect: fn(&Invocation<'_>, &Fut::Output)) -> Self {
        Self {
            invocation: Some(invocation),
            inner: Box::pin(fut),
            inspect,
        }
    }
}

impl<Fut: Future> Future for TracedFuture<'_, Fut> {
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let inner = this.inner.as_mut();
        match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(output)) => {
                if let Some(invocation) = this.invocation.take() {
                    (this.inspect)(&invocation, &output);
                }
                Poll::Ready(output)
            }
            Err(payload) => {
                if let Some(invocation) = this.invocation.take() {
                    invocation.panicked(&*payload);
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

/// Wrap a function with [`log`], naming it after the function item or an
/// explicit name, with the current file as its defining file.
///
/// ```ignore
/// let traced = traced!(logger, parse_header);
/// let traced = traced!(logger, "double" => |(x,): (i32,)| x * 2);
/// ```
#[macro_export]
macro_rules! traced {
    ($logger:expr, $name:expr => $f:expr) => {
        $crate::trace::log(&$logger).wrap($crate::trace::Target::new($name, file!()), $f)
    };
    ($logger:expr, $f:ident) => {
        $crate::trace::log(&$logger).wrap($crate::trace::Target::new(stringify!($f), file!()), $f)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::WithKwargs;
    use crate::layer::CallSiteLayer;
    use crate::memory_sink::MemorySink;
    use serde_json::json;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    fn subscriber(sink: &MemorySink) -> impl tracing::Subscriber + Send + Sync + 'static {
        Registry::default().with(CallSiteLayer::new(Severity::Debug, vec![Arc::new(sink.clone())]))
    }

    fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
        let sink = MemorySink::new();
        let value = tracing::subscriber::with_default(subscriber(&sink), f);
        (value, sink.lines())
    }

    fn messages(lines: &[String]) -> Vec<&str> {
        lines
            .iter()
            .map(|l| l.lines().next().unwrap().split(" -> ").nth(1).unwrap())
            .collect()
    }

    fn double_it((x,): (i32,)) -> i32 {
        x * 2
    }

    #[test]
    fn wrapper_reflects_target_identity() {
        let traced = traced!(Logger::new("app"), double_it);
        assert_eq!(traced.name(), "double_it");
        assert_eq!(traced.file(), file!());
        assert_eq!((traced.inner())((4,)), 8);
    }

    #[test]
    fn successful_call_logs_start_and_end() {
        let logger = Logger::new("app");
        let double = traced!(logger, "f" => |(x,): (i32,)| x * 2);

        let line_no = line!() + 1;
        let (value, lines) = capture(|| double.call((21,)));

        assert_eq!(value, 42);
        assert_eq!(messages(&lines), ["[START] f", "[END] f"]);
        let site = format!("\t{} - f:(21,):{} -> ", file!(), line_no);
        assert!(lines.iter().all(|l| l.contains(&site)), "{:?}", lines);
        assert!(lines.iter().all(|l| l.contains("] INFO\t")));
    }

    #[test]
    fn err_is_logged_then_propagated() {
        let logger = Logger::new("app");
        let parse = traced!(logger, "parse" => |(x,): (i32,)| -> Result<i32, String> {
            Err(format!("bad input {}", x))
        });

        let (result, lines) = capture(|| parse.try_call((7,)));

        assert_eq!(result, Err("bad input 7".to_string()));
        assert_eq!(
            messages(&lines),
            ["[START] parse", "[EXCEPTION] parse bad input 7", "[END] parse"]
        );
        assert!(lines[1].contains("] ERROR\t"));
        assert_eq!(lines[1].lines().nth(1), Some("\"bad input 7\""));
    }

    #[test]
    fn ok_result_passes_through_try_call() {
        let logger = Logger::new("app");
        let parse = traced!(logger, "parse" => |(s,): (&str,)| s.parse::<i32>());

        let (result, lines) = capture(|| parse.try_call(("12",)));

        assert_eq!(result, Ok(12));
        assert_eq!(messages(&lines), ["[START] parse", "[END] parse"]);
    }

    #[test]
    fn swallowing_variant_returns_none() {
        let logger = Logger::new("app");
        let parse = traced!(logger, "parse" => |(s,): (&str,)| s.parse::<i32>());

        let (result, lines) = capture(|| parse.try_call_or_none(("twelve",)));

        assert_eq!(result, None);
        assert_eq!(lines.len(), 3);
        assert!(messages(&lines)[1].starts_with("[EXCEPTION] parse invalid digit"));
        assert_eq!(messages(&lines)[2], "[END] parse");
    }

    #[test]
    fn panic_is_logged_then_resumed() {
        let logger = Logger::new("app");
        let boom = traced!(logger, "boom" => |(): ()| -> i32 { panic!("kaboom") });

        let (result, lines) = capture(|| panic::catch_unwind(AssertUnwindSafe(|| boom.call(()))));

        assert!(result.is_err());
        assert_eq!(
            messages(&lines),
            ["[START] boom", "[EXCEPTION] boom kaboom", "[END] boom"]
        );
        assert_eq!(lines[1].lines().nth(1), Some("panicked: kaboom"));
    }

    #[test]
    fn panic_is_swallowed_by_call_or_none() {
        let logger = Logger::new("app");
        let boom = traced!(logger, "boom" => |(n,): (u8,)| -> u8 {
            if n > 1 {
                panic!("too big: {}", n)
            }
            n
        });

        let (results, lines) = capture(|| (boom.call_or_none((1,)), boom.call_or_none((9,))));

        assert_eq!(results, (Some(1), None));
        assert_eq!(
            messages(&lines),
            ["[START] boom", "[END] boom", "[START] boom", "[EXCEPTION] boom too big: 9", "[END] boom"]
        );
    }

    #[test]
    fn keyword_arguments_use_pair_form() {
        let logger = Logger::new("app");
        let scale = traced!(logger, "scale" => |call: WithKwargs<(i64,), serde_json::Value>| {
            call.args.0 * call.kwargs["x"].as_i64().unwrap_or(1)
        });

        let (value, lines) = capture(|| {
            (
                scale.call(WithKwargs::new((1,), json!({"x": 2}))),
                traced!(Logger::new("app"), "add" => |(a, b): (i32, i32)| a + b).call((1, 2)),
            )
        });

        assert_eq!(value, (2, 3));
        assert!(lines[0].contains(" - scale:((1,), (1, {\"x\": 2})):"), "{}", lines[0]);
        assert!(lines[2].contains(" - add:(1, 2):"), "{}", lines[2]);
    }

    #[test]
    fn nested_calls_are_properly_bracketed() {
        let logger = Logger::new("app");
        let inner = traced!(logger, "temp" => |(data,): (serde_json::Value,)| data.to_string());
        let outer = traced!(logger, "main" => |(): ()| inner.call((json!({"a": "b"}),)));

        let (value, lines) = capture(|| outer.call(()));

        assert_eq!(value, "{\"a\":\"b\"}");
        assert_eq!(
            messages(&lines),
            ["[START] main", "[START] temp", "[END] temp", "[END] main"]
        );
        assert!(lines[1].contains(" - temp:({\"a\":\"b\"},):"));
    }

    #[tokio::test]
    async fn async_call_logs_around_completion() {
        let sink = MemorySink::new();
        let _guard = tracing::subscriber::set_default(subscriber(&sink));
        let logger = Logger::new("app");
        let bump = traced!(logger, "bump" => |(x,): (u64,)| async move {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            x + 1
        });

        assert_eq!(bump.call_async((1,)).await, 2);
        assert_eq!(messages(&sink.lines()), ["[START] bump", "[END] bump"]);
    }

    #[tokio::test]
    async fn async_err_and_drop_still_end() {
        let sink = MemorySink::new();
        let _guard = tracing::subscriber::set_default(subscriber(&sink));
        let logger = Logger::new("app");
        let fetch = traced!(logger, "fetch" => |(id,): (u32,)| async move {
            if id == 0 {
                Err(format!("no record {}", id))
            } else {
                Ok(id)
            }
        });

        assert_eq!(fetch.try_call_async((0,)).await, Err("no record 0".to_string()));
        drop(fetch.try_call_async((5,)));

        assert_eq!(
            messages(&sink.lines()),
            [
                "[START] fetch",
                "[EXCEPTION] fetch no record 0",
                "[END] fetch",
                "[START] fetch",
                "[END] fetch",
            ]
        );
    }

    #[tokio::test]
    async fn panic_while_building_the_future_is_logged() {
        let sink = MemorySink::new();
        let _guard = tracing::subscriber::set_default(subscriber(&sink));
        let logger = Logger::new("app");
        let make = traced!(logger, "make" => |(): ()| -> std::future::Ready<i32> {
            panic!("sync part")
        });

        let result = panic::catch_unwind(AssertUnwindSafe(|| drop(make.call_async(()))));

        assert!(result.is_err());
        let lines = sink.lines();
        assert_eq!(
            messages(&lines),
            ["[START] make", "[EXCEPTION] make sync part", "[END] make"]
        );
        assert_eq!(lines[1].lines().nth(1), Some("panicked: sync part"));
    }
}
