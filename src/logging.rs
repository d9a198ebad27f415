//! # Logging Bootstrap
//!
//! Process-wide `tracing` subscriber setup for applications that use the
//! built-in [`TracingTarget`](crate::target::TracingTarget). Completion
//! logging itself never installs a subscriber; call [`init_logging`] once
//! during startup, before the first request is served.

use std::io;

use serde_json::{json, Value};
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::BoxError;

/// Subscriber configuration for the logging bootstrap.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug") used when no env filter is set.
    pub level: String,
    /// Emit JSON structured output instead of plain text.
    pub json_format: bool,
    /// Pretty-print text output for development.
    pub pretty_print: bool,
    /// Environment filter, supports directives like "logbook=debug,hyper=warn".
    pub env_filter: Option<String>,
    /// Custom fields reported with the initialization event.
    pub global_fields: serde_json::Map<String, Value>,
    /// Service name reported with the initialization event.
    pub service_name: Option<String>,
    /// Service version reported with the initialization event.
    pub service_version: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: true,
            env_filter: None,
            global_fields: serde_json::Map::new(),
            service_name: None,
            service_version: None,
        }
    }
}

impl LoggingConfig {
    /// Production configuration: JSON output, info level.
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            env_filter: Some("logbook=info".to_string()),
            global_fields: {
                let mut fields = serde_json::Map::new();
                fields.insert("env".to_string(), json!("production"));
                fields
            },
            service_name: None,
            service_version: None,
        }
    }

    /// Development configuration: pretty text output, debug level.
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            env_filter: Some("logbook=debug".to_string()),
            global_fields: {
                let mut fields = serde_json::Map::new();
                fields.insert("env".to_string(), json!("development"));
                fields
            },
            service_name: None,
            service_version: None,
        }
    }

    /// Test configuration: minimal output.
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            env_filter: Some("logbook=error".to_string()),
            global_fields: serde_json::Map::new(),
            service_name: None,
            service_version: None,
        }
    }

    /// Add a custom field to the initialization event.
    pub fn with_global_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.global_fields.insert(key.into(), value.into());
        self
    }

    /// Set the service name and version.
    pub fn with_service(mut self, name: &str, version: &str) -> Self {
        self.service_name = Some(name.to_string());
        self.service_version = Some(version.to_string());
        self
    }

    /// Override the environment filter.
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }
}

/// Install the global `tracing` subscriber described by `config`.
///
/// The `RUST_LOG` environment variable takes precedence over the configured
/// filter. Fails if a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), BoxError> {
    let fallback = config.env_filter.as_deref().unwrap_or(&config.level);
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).json())
            .try_init()?;
    } else if config.pretty_print {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).pretty())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout))
            .try_init()?;
    }

    if config.global_fields.is_empty() && config.service_name.is_none() {
        tracing::debug!(
            target: "logbook",
            "logging initialized (level: {}, format: {})",
            config.level,
            if config.json_format { "json" } else { "text" }
        );
    } else {
        let mut init_event = json!({
            "level": config.level,
            "format": if config.json_format { "json" } else { "text" },
        });
        if let Some(name) = config.service_name {
            init_event["service_name"] = json!(name);
        }
        if let Some(version) = config.service_version {
            init_event["service_version"] = json!(version);
        }
        for (key, value) in config.global_fields {
            init_event[key] = value;
        }
        tracing::debug!(target: "logbook", "logging initialized: {}", init_event);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_pick_sensible_filters() {
        assert_eq!(LoggingConfig::production().env_filter.as_deref(), Some("logbook=info"));
        assert_eq!(LoggingConfig::development().env_filter.as_deref(), Some("logbook=debug"));
        assert_eq!(LoggingConfig::test().level, "error");
    }

    #[test]
    fn presets_tag_their_environment() {
        assert_eq!(
            LoggingConfig::production().global_fields.get("env"),
            Some(&json!("production"))
        );
        assert_eq!(
            LoggingConfig::development().global_fields.get("env"),
            Some(&json!("development"))
        );
        assert!(LoggingConfig::test().global_fields.is_empty());
    }

    #[test]
    fn env_filter_override() {
        let config = LoggingConfig::default().with_env_filter("logbook=trace");
        assert_eq!(config.env_filter.as_deref(), Some("logbook=trace"));
    }

    #[test]
    fn global_fields_and_service_identity() {
        let config = LoggingConfig::default()
            .with_service("orders-api", "1.4.2")
            .with_global_field("region", "eu-west-1")
            .with_global_field("replicas", 3);

        assert_eq!(config.service_name.as_deref(), Some("orders-api"));
        assert_eq!(config.service_version.as_deref(), Some("1.4.2"));
        assert_eq!(config.global_fields.get("region"), Some(&json!("eu-west-1")));
        assert_eq!(config.global_fields.get("replicas"), Some(&json!(3)));
    }
}
