//! Process-wide diagnostic callback
//!
//! Everything in the crate logs through `tracing`. A host that wants the
//! messages registers a callback; [`CallbackLayer`] forwards each event to it
//! as a leveled line of text. Registering is optional and has no effect on
//! encoder behavior.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Severity passed to the callback
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Trace,
        }
    }
}

pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

static CALLBACK: RwLock<Option<LogCallback>> = parking_lot::const_rwlock(None);

/// Directives used when `RUST_LOG` is unset; per-frame `trace!` events stay off
pub const DEFAULT_CALLBACK_FILTER: &str = "videnc_core=debug";

fn callback_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_CALLBACK_FILTER))
}

/// Install `callback` as the process-wide log sink, replacing any previous one
///
/// If the process has no global `tracing` subscriber yet, one consisting of
/// [`CallbackLayer`] is installed so the callback receives events. That
/// subscriber honors `RUST_LOG` and defaults to [`DEFAULT_CALLBACK_FILTER`].
pub fn register_log_callback<F>(callback: F)
where
    F: Fn(LogLevel, &str) + Send + Sync + 'static,
{
    *CALLBACK.write() = Some(Arc::new(callback));

    if !tracing::dispatcher::has_been_set() {
        let subscriber =
            tracing_subscriber::registry().with(CallbackLayer.with_filter(callback_filter()));
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!("installed callback log subscriber");
        }
    }
}

/// Remove the registered callback
pub fn clear_log_callback() {
    *CALLBACK.write() = None;
}

/// `tracing` layer forwarding events to the registered callback
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackLayer;

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for CallbackLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // Clone out so the callback runs without holding the lock.
        let Some(callback) = CALLBACK.read().clone() else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        let line = format!("[{}] {}{}", meta.target(), visitor.message, visitor.fields);
        callback(LogLevel::from(*meta.level()), &line);
    }
}
