//! Log targets
//!
//! A [`LogTarget`] is the seam between completion logging and whatever sink
//! the application logs to. The built-in [`TracingTarget`] forwards events to
//! the `tracing` ecosystem; a process-wide shared target can be installed once
//! at startup and is used by any middleware without an explicit override.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::Level;

use crate::errors::ConfigError;
use crate::event::LogEvent;

/// `tracing` target name for emitted request-completion events.
pub const EVENT_TARGET: &str = "logbook::request";

/// A severity-gated sink for completion events.
pub trait LogTarget: Send + Sync {
    /// Whether an event at `level` would be recorded. When this returns
    /// false the middleware skips enrichment and event assembly entirely.
    fn is_enabled(&self, level: Level) -> bool;

    /// Record one event.
    fn write(&self, event: &LogEvent);
}

/// The default target: renders the message template and emits a `tracing`
/// event carrying the merged properties as a JSON field.
#[derive(Debug, Default)]
pub struct TracingTarget;

impl TracingTarget {
    pub fn new() -> Self {
        Self
    }
}

impl LogTarget for TracingTarget {
    fn is_enabled(&self, level: Level) -> bool {
        if level == Level::ERROR {
            tracing::event_enabled!(target: EVENT_TARGET, Level::ERROR)
        } else if level == Level::WARN {
            tracing::event_enabled!(target: EVENT_TARGET, Level::WARN)
        } else if level == Level::INFO {
            tracing::event_enabled!(target: EVENT_TARGET, Level::INFO)
        } else if level == Level::DEBUG {
            tracing::event_enabled!(target: EVENT_TARGET, Level::DEBUG)
        } else {
            tracing::event_enabled!(target: EVENT_TARGET, Level::TRACE)
        }
    }

    fn write(&self, event: &LogEvent) {
        let message = event.render_message();
        let properties = Value::Object(
            event
                .properties
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        );
        let error = event.error.as_ref().map(|e| e.to_string());

        // `tracing::event!` requires a const level, so dispatch per level.
        macro_rules! emit {
            ($level:expr) => {
                match &error {
                    Some(error) => tracing::event!(
                        target: EVENT_TARGET,
                        $level,
                        properties = %properties,
                        error = %error,
                        "{}",
                        message
                    ),
                    None => tracing::event!(
                        target: EVENT_TARGET,
                        $level,
                        properties = %properties,
                        "{}",
                        message
                    ),
                }
            };
        }

        if event.level == Level::ERROR {
            emit!(Level::ERROR);
        } else if event.level == Level::WARN {
            emit!(Level::WARN);
        } else if event.level == Level::INFO {
            emit!(Level::INFO);
        } else if event.level == Level::DEBUG {
            emit!(Level::DEBUG);
        } else {
            emit!(Level::TRACE);
        }
    }
}

static SHARED_TARGET: OnceCell<Arc<dyn LogTarget>> = OnceCell::new();

/// Install the process-wide shared target. Fails if one is already installed;
/// call this once during startup, before the first request is served.
pub fn set_shared_target(target: Arc<dyn LogTarget>) -> Result<(), ConfigError> {
    SHARED_TARGET
        .set(target)
        .map_err(|_| ConfigError::SharedTargetAlreadySet)
}

/// The process-wide shared target, falling back to [`TracingTarget`] when
/// none was installed.
pub fn shared_target() -> Arc<dyn LogTarget> {
    SHARED_TARGET
        .get_or_init(|| Arc::new(TracingTarget::new()))
        .clone()
}
