//! Completion log events

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::Level;

use crate::errors::CapturedError;
use crate::template::MessageTemplate;

/// One structured event describing a completed request.
///
/// Exactly zero or one of these is produced per request: zero when the
/// resolved target is disabled for the event's severity, one otherwise.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Wall-clock time at which the event was assembled.
    pub timestamp: DateTime<Utc>,
    /// Resolved severity.
    pub level: Level,
    /// The handler error, or the error captured into the diagnostic context
    /// when the handler itself succeeded.
    pub error: Option<CapturedError>,
    /// The parsed message template, shared across events from one middleware.
    pub template: Arc<MessageTemplate>,
    /// Collected properties merged with the request-outcome properties.
    pub properties: HashMap<String, Value>,
}

impl LogEvent {
    /// Render the message template against this event's properties.
    pub fn render_message(&self) -> String {
        self.template.render(&self.properties)
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}
