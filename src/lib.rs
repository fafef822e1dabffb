//! Call-site enriched logging on top of `tracing`.
//!
//! [`get_logger`] installs, once per process, a subscriber that writes every
//! event as one human-readable line to a file and to stderr:
//!
//! ```text
//! [2024-05-17 09:03:07,412] INFO	src/main.rs - f:(21,):14 -> [START] f
//! ```
//!
//! [`log`] wraps functions so each call is traced with `[START]`,
//! `[EXCEPTION]` and `[END]` records carrying the target's file, name,
//! calling line and arguments.

pub mod args;
pub mod env;
pub mod error;
pub mod filter;
pub mod format;
pub mod init;
pub mod layer;
pub mod logger;
pub mod memory_sink;
pub mod record;
pub mod severity;
pub mod sink;
pub mod trace;

pub use args::{CallArgs, ToCallArgs, WithKwargs};
pub use error::{ConfigError, InitError};
pub use init::{get_logger, get_logger_with_config, LoggerConfig};
pub use logger::Logger;
pub use severity::Severity;
pub use trace::{log, Decorator, Target, Traced};
