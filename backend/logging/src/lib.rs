//! Structured logging for long-running services.
//!
//! Every record is written twice: a human-readable line to `<folder>/<prefix>.log`
//! and a JSON object to `<folder>/json/<prefix>.log`. Files are rotated by size
//! and at UTC midnight, old archives are pruned, and per-scope minimum levels
//! can be changed at runtime through a watched config file.
//!
//! ```no_run
//! # async fn run() -> runelog::Result<()> {
//! let guard = runelog::init(&runelog::LogConfig::default())?;
//! runelog::info("service started", &[runelog::kv("port", 8080)]);
//!
//! let res: Result<(), std::io::Error> = Ok(());
//! if runelog::with_result(&res).error("could not bind", &[]) {
//!     return Ok(());
//! }
//! guard.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod dual_sink;
pub mod error;
pub mod format;
pub mod fs;
pub mod global;
pub mod housekeeping;
pub mod logger;
pub mod record;
pub mod redact;
pub mod retention;
pub mod scope;
pub mod severity;
pub mod sink;

pub use bridge::LoggerLayer;
pub use config::{init, LogConfig, LogGuard};
pub use dual_sink::{DualSink, FileRotation, RotationReport};
pub use error::{LogError, Result};
pub use global::{
    attach_dynamic_scopes, debug, default_logger, error, fatal, info, level, notice, printf,
    trace, warning, with_context, with_error, with_error_fn, with_local_scope, with_result,
    without_escalation,
};
pub use housekeeping::{start_background_rotation, HousekeepingPolicy};
pub use logger::Logger;
pub use record::{kv, Attr, CallSite, LogRecord};
pub use redact::Redacted;
pub use scope::{ScopeRegistry, ScopeRule};
pub use severity::Severity;
pub use sink::{ConsoleSink, LevelGate, RecordSink};
