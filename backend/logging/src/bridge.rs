//! Forward `tracing` events into a [`Logger`].
//!
//! Lets code that already uses `tracing::info!` and friends land in the same
//! dual sink, with the same filtering, as direct logger calls.

use std::fmt;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{LogError, Result};
use crate::global;
use crate::logger::Logger;
use crate::record::{Attr, CallSite};
use crate::severity::Severity;

/// A `tracing-subscriber` layer that re-emits events through a logger.
#[derive(Debug, Default)]
pub struct LoggerLayer {
    /// `None` follows the process-wide default logger.
    logger: Option<Logger>,
}

impl LoggerLayer {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    /// Follow whatever logger is the process default at event time.
    pub fn following_default() -> Self {
        Self::default()
    }
}

impl<S: Subscriber> Layer<S> for LoggerLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let site = CallSite::new(
            meta.file().unwrap_or("<unknown>"),
            meta.line().unwrap_or(0),
            meta.module_path().unwrap_or_else(|| meta.target()),
        );
        let logger = self.logger.clone().unwrap_or_else(global::default_logger);
        logger.log_at(Severity::from(*meta.level()), &fields.message, &fields.attrs, site);
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    attrs: Vec<Attr>,
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.attrs.push(Attr::new(field.name(), value));
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::String(value.to_string()));
    }
}

/// Install a global `tracing` subscriber that forwards into `logger`.
pub fn install(logger: Logger) -> Result<()> {
    tracing_subscriber::registry()
        .with(LoggerLayer::new(logger))
        .try_init()
        .map_err(|e| LogError::Other(anyhow::anyhow!("unable to install tracing bridge: {e}")))
}
