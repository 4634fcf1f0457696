//! Logger front end.
//!
//! A [`Logger`] is an immutable value: every `with_*` call returns a new
//! logger and leaves the receiver untouched, so loggers can be freely cloned
//! into closures, struct fields and other threads.
//!
//! Each call runs the same policy:
//!
//! 1. evaluate a lazily attached error, once;
//! 2. escalate to ERROR when an error is present (unless escalation is off);
//! 3. suppress error-bound calls that turned out to have no error;
//! 4. drop records below the sink or scope minimum;
//! 5. build the record and hand it to the sink.
//!
//! Every level method returns `true` iff an error was present, which makes
//! `if log.with_error(res.err()).error("...") { return; }` a reliable guard.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::global;
use crate::record::{kv, Attr, CallSite, LogRecord};
use crate::scope::ScopeRegistry;
use crate::severity::Severity;
use crate::sink::{ConsoleSink, RecordSink};

type ErrorProducer = dyn Fn() -> Option<anyhow::Error> + Send + Sync;

/// An attached error: either a value or a closure evaluated per call.
#[derive(Clone)]
enum AttachedError {
    Value(Option<Arc<anyhow::Error>>),
    Producer(Arc<ErrorProducer>),
}

impl AttachedError {
    fn evaluate(&self) -> Option<Arc<anyhow::Error>> {
        match self {
            AttachedError::Value(err) => err.clone(),
            AttachedError::Producer(produce) => produce().map(Arc::new),
        }
    }
}

enum Site {
    Caller(&'static Location<'static>),
    Explicit(CallSite),
}

#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn RecordSink>,
    context: Arc<[Attr]>,
    error: Option<AttachedError>,
    scopes: Arc<ScopeRegistry>,
    scope: Option<Arc<str>>,
    scope_level: Severity,
    escalate: bool,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("context", &self.context)
            .field("error_bound", &self.error_bound())
            .field("scope", &self.scope)
            .field("scope_level", &self.scope_level)
            .field("escalate", &self.escalate)
            .finish_non_exhaustive()
    }
}

impl Logger {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self {
            sink,
            context: Arc::from(Vec::new()),
            error: None,
            scopes: Arc::new(ScopeRegistry::new()),
            scope: None,
            scope_level: Severity::TRACE,
            escalate: true,
        }
    }

    /// Logger writing human lines to stdout.
    pub fn console(level: Severity) -> Self {
        Self::new(Arc::new(ConsoleSink::new(level)))
    }

    pub fn sink(&self) -> &Arc<dyn RecordSink> {
        &self.sink
    }

    /// Registry consulted for scope overrides.
    pub fn scopes(&self) -> &Arc<ScopeRegistry> {
        &self.scopes
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn error_bound(&self) -> bool {
        self.error.is_some()
    }

    pub fn with_scope_registry(&self, scopes: Arc<ScopeRegistry>) -> Logger {
        let mut l = self.clone();
        l.scopes = scopes;
        l
    }

    /// Attach key/value pairs that are prepended to every record.
    pub fn with_context(&self, attrs: impl IntoIterator<Item = Attr>) -> Logger {
        let mut l = self.clone();
        l.context = self.context.iter().cloned().chain(attrs).collect();
        l
    }

    /// Bind an error. Calls made through the returned logger are only emitted
    /// when `err` is `Some` (while escalation is on).
    pub fn with_error<E>(&self, err: Option<E>) -> Logger
    where
        E: Into<anyhow::Error>,
    {
        let mut l = self.clone();
        l.error = Some(AttachedError::Value(err.map(|e| Arc::new(e.into()))));
        l
    }

    /// Bind the error side of `res`, rendered through `Display`.
    pub fn with_result<T, E: fmt::Display>(&self, res: &Result<T, E>) -> Logger {
        self.with_error(res.as_ref().err().map(|e| anyhow::anyhow!("{e}")))
    }

    /// Bind an error producer, evaluated once per log call.
    pub fn with_error_fn<F, E>(&self, produce: F) -> Logger
    where
        F: Fn() -> Option<E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        let mut l = self.clone();
        l.error = Some(AttachedError::Producer(Arc::new(
            move || -> Option<anyhow::Error> { produce().map(Into::into) },
        )));
        l
    }

    pub fn without_escalation(&self) -> Logger {
        let mut l = self.clone();
        l.escalate = false;
        l
    }

    /// Bind `scope` (normally `module_path!()`) with its default minimum
    /// severity. Scope rules in the registry override the default.
    #[track_caller]
    pub fn with_local_scope(&self, scope: impl Into<String>, default_level: Severity) -> Logger {
        let l = self.bind_scope(scope, default_level);
        l.trace(
            "local scope added",
            &[kv("scope_level", default_level.to_string())],
        );
        l
    }

    pub(crate) fn bind_scope(&self, scope: impl Into<String>, default_level: Severity) -> Logger {
        let mut l = self.clone();
        l.scope = Some(Arc::from(scope.into()));
        l.scope_level = default_level;
        l
    }

    /// Make this logger the process-wide default.
    pub fn set_default(&self) {
        global::replace_default(self.clone());
    }

    #[track_caller]
    pub fn trace(&self, msg: &str, attrs: &[Attr]) -> bool {
        self.dispatch(Severity::TRACE, msg, attrs, Site::Caller(Location::caller()))
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, attrs: &[Attr]) -> bool {
        self.dispatch(Severity::DEBUG, msg, attrs, Site::Caller(Location::caller()))
    }

    #[track_caller]
    pub fn info(&self, msg: &str, attrs: &[Attr]) -> bool {
        self.dispatch(Severity::INFO, msg, attrs, Site::Caller(Location::caller()))
    }

    #[track_caller]
    pub fn notice(&self, msg: &str, attrs: &[Attr]) -> bool {
        self.dispatch(Severity::NOTICE, msg, attrs, Site::Caller(Location::caller()))
    }

    #[track_caller]
    pub fn warning(&self, msg: &str, attrs: &[Attr]) -> bool {
        self.dispatch(Severity::WARNING, msg, attrs, Site::Caller(Location::caller()))
    }

    #[track_caller]
    pub fn error(&self, msg: &str, attrs: &[Attr]) -> bool {
        self.dispatch(Severity::ERROR, msg, attrs, Site::Caller(Location::caller()))
    }

    #[track_caller]
    pub fn level(&self, level: Severity, msg: &str, attrs: &[Attr]) -> bool {
        self.dispatch(level, msg, attrs, Site::Caller(Location::caller()))
    }

    #[track_caller]
    pub fn printf(&self, args: fmt::Arguments<'_>) {
        let msg = fmt::format(args);
        self.dispatch(Severity::INFO, &msg, &[], Site::Caller(Location::caller()));
    }

    /// Log at FATAL, then panic. The panic happens even when the record
    /// itself was suppressed.
    #[track_caller]
    pub fn fatal(&self, msg: &str, attrs: &[Attr]) -> ! {
        self.dispatch(Severity::FATAL, msg, attrs, Site::Caller(Location::caller()));
        panic!("{msg}");
    }

    /// Log with an explicit call site, for records that originate elsewhere
    /// (for example bridged `tracing` events).
    pub fn log_at(&self, level: Severity, msg: &str, attrs: &[Attr], site: CallSite) -> bool {
        self.dispatch(level, msg, attrs, Site::Explicit(site))
    }

    /// Severity a call at `requested` is emitted at, or `None` when the
    /// escalation policy suppresses it.
    pub fn effective_level(&self, requested: Severity, had_error: bool) -> Option<Severity> {
        if had_error {
            if self.escalate && requested < Severity::ERROR {
                return Some(Severity::ERROR);
            }
            return Some(requested);
        }
        if self.error_bound() && (requested >= Severity::ERROR || self.escalate) {
            return None;
        }
        Some(requested)
    }

    /// Minimum severity for this logger's scope, if one is bound.
    pub fn scope_minimum(&self) -> Option<Severity> {
        let scope = self.scope.as_deref()?;
        Some(self.scopes.resolve(scope).unwrap_or(self.scope_level))
    }

    fn dispatch(&self, requested: Severity, msg: &str, attrs: &[Attr], site: Site) -> bool {
        let error = self.error.as_ref().and_then(AttachedError::evaluate);
        let had_error = error.is_some();

        let Some(level) = self.effective_level(requested, had_error) else {
            return false;
        };
        if !self.sink.enabled(level) {
            return had_error;
        }
        if matches!(self.scope_minimum(), Some(minimum) if level < minimum) {
            return had_error;
        }

        let site = match site {
            Site::Caller(location) => CallSite::from_location(location, self.scope.as_deref()),
            Site::Explicit(site) => site,
        };
        let mut record = LogRecord::new(level, msg, site);
        record.error = error.map(|e| format!("{e:#}"));
        record.scope = self.scope.as_deref().map(str::to_string);
        record.attrs = self.context.iter().chain(attrs).cloned().collect();

        if let Err(e) = self.sink.handle(&record) {
            eprintln!("runelog: dropped {} record: {e}", record.severity);
        }
        had_error
    }
}
