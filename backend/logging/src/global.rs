//! Process-wide default logger and package-level shortcuts.
//!
//! The default starts as a DEBUG console logger and can be swapped at any
//! time with [`Logger::set_default`]. Readers clone the current value under a
//! read lock, so a concurrent replacement is never observed half-done.

use std::fmt;
use std::path::Path;
use std::sync::{LazyLock, PoisonError, RwLock};

use crate::error::Result;
use crate::logger::Logger;
use crate::record::Attr;
use crate::severity::Severity;

static DEFAULT: LazyLock<RwLock<Logger>> =
    LazyLock::new(|| RwLock::new(Logger::console(Severity::DEBUG)));

/// Scope default for the engine's own diagnostics.
const INTERNAL_SCOPE_LEVEL: Severity = Severity::INFO;

/// Snapshot of the current default logger.
pub fn default_logger() -> Logger {
    DEFAULT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub(crate) fn replace_default(logger: Logger) {
    *DEFAULT.write().unwrap_or_else(PoisonError::into_inner) = logger;
}

/// Default logger scoped to one of this crate's modules.
pub(crate) fn internal_logger(module: &'static str) -> Logger {
    default_logger().bind_scope(module, INTERNAL_SCOPE_LEVEL)
}

/// Attach a hot-reloaded scope config to the default logger's registry.
pub fn attach_dynamic_scopes(path: impl AsRef<Path>) -> Result<()> {
    default_logger().scopes().attach(path)
}

#[track_caller]
pub fn trace(msg: &str, attrs: &[Attr]) -> bool {
    default_logger().trace(msg, attrs)
}

#[track_caller]
pub fn debug(msg: &str, attrs: &[Attr]) -> bool {
    default_logger().debug(msg, attrs)
}

#[track_caller]
pub fn info(msg: &str, attrs: &[Attr]) -> bool {
    default_logger().info(msg, attrs)
}

#[track_caller]
pub fn notice(msg: &str, attrs: &[Attr]) -> bool {
    default_logger().notice(msg, attrs)
}

#[track_caller]
pub fn warning(msg: &str, attrs: &[Attr]) -> bool {
    default_logger().warning(msg, attrs)
}

#[track_caller]
pub fn error(msg: &str, attrs: &[Attr]) -> bool {
    default_logger().error(msg, attrs)
}

#[track_caller]
pub fn level(level: Severity, msg: &str, attrs: &[Attr]) -> bool {
    default_logger().level(level, msg, attrs)
}

#[track_caller]
pub fn printf(args: fmt::Arguments<'_>) {
    default_logger().printf(args)
}

#[track_caller]
pub fn fatal(msg: &str, attrs: &[Attr]) -> ! {
    default_logger().fatal(msg, attrs)
}

pub fn with_context(attrs: impl IntoIterator<Item = Attr>) -> Logger {
    default_logger().with_context(attrs)
}

pub fn with_error<E: Into<anyhow::Error>>(err: Option<E>) -> Logger {
    default_logger().with_error(err)
}

pub fn with_result<T, E: fmt::Display>(res: &std::result::Result<T, E>) -> Logger {
    default_logger().with_result(res)
}

pub fn with_error_fn<F, E>(produce: F) -> Logger
where
    F: Fn() -> Option<E> + Send + Sync + 'static,
    E: Into<anyhow::Error>,
{
    default_logger().with_error_fn(produce)
}

pub fn without_escalation() -> Logger {
    default_logger().without_escalation()
}

#[track_caller]
pub fn with_local_scope(scope: impl Into<String>, default_level: Severity) -> Logger {
    default_logger().with_local_scope(scope, default_level)
}

/// Default logger scoped to the calling module.
///
/// ```
/// use runelog::{local_scope, Severity};
///
/// let log = local_scope!(Severity::WARNING);
/// log.warning("disk almost full", &[]);
/// ```
#[macro_export]
macro_rules! local_scope {
    ($level:expr) => {
        $crate::with_local_scope(::std::module_path!(), $level)
    };
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::kv;
    use crate::sink::capture::CaptureSink;
    use std::sync::Arc;

    fn swap_in_capture() -> (Arc<CaptureSink>, Logger) {
        let previous = default_logger();
        let sink = Arc::new(CaptureSink::new(Severity::TRACE));
        Logger::new(sink.clone()).set_default();
        (sink, previous)
    }

    #[test]
    fn test_package_level_calls_use_default() {
        let _serial = testing::serial();
        let (sink, previous) = swap_in_capture();

        info("from package", &[kv("n", 1)]);
        assert!(with_error(Some(std::fmt::Error)).debug("escalated", &[]));
        assert!(!with_error(None::<std::fmt::Error>).error("suppressed", &[]));

        let records = sink.records();
        previous.set_default();

        let messages: Vec<&str> = records.iter().map(|r| r.message.as_str()).collect();
        assert!(messages.contains(&"from package"));
        assert!(messages.contains(&"escalated"));
        assert!(!messages.contains(&"suppressed"));
        let here = records.iter().find(|r| r.message == "from package").unwrap();
        assert_eq!(here.site.file, "global.rs");
    }

    #[test]
    fn test_set_default_does_not_touch_receiver() {
        let _serial = testing::serial();
        let (sink, previous) = swap_in_capture();
        let scoped = default_logger().with_local_scope("app", Severity::ERROR);
        scoped.set_default();
        assert_eq!(default_logger().scope(), Some("app"));
        assert_eq!(scoped.scope(), Some("app"));

        // the capture logger we installed first is unchanged
        Logger::new(sink.clone()).set_default();
        assert_eq!(default_logger().scope(), None);
        previous.set_default();
    }

    #[test]
    fn test_local_scope_macro_binds_module_path() {
        let _serial = testing::serial();
        let (sink, previous) = swap_in_capture();
        let log = crate::local_scope!(Severity::NOTICE);
        log.notice("scoped", &[]);
        previous.set_default();

        let record = sink
            .records()
            .into_iter()
            .find(|r| r.message == "scoped")
            .unwrap();
        assert_eq!(record.scope.as_deref(), Some(module_path!()));
    }

    #[test]
    fn test_concurrent_replacement_is_never_torn() {
        let _serial = testing::serial();
        let previous = default_logger();
        let a = Logger::console(Severity::FATAL).bind_scope("a", Severity::FATAL);
        let b = Logger::console(Severity::FATAL).bind_scope("b", Severity::FATAL);

        let writer = {
            let (a, b) = (a.clone(), b.clone());
            std::thread::spawn(move || {
                for i in 0..1000 {
                    if i % 2 == 0 {
                        a.set_default()
                    } else {
                        b.set_default()
                    }
                }
            })
        };
        for _ in 0..1000 {
            let scope = default_logger().scope().map(str::to_string);
            assert!(matches!(scope.as_deref(), Some("a") | Some("b") | None));
        }
        writer.join().unwrap();
        previous.set_default();
    }
}
