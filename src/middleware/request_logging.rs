//! # Request Completion Logging Middleware
//!
//! Wraps the downstream handler and emits exactly one structured event per
//! request, carrying the request outcome (method, path, status, elapsed time,
//! error) merged with every property contributed to the request's
//! [`DiagnosticContext`] while it was in flight.
//!
//! The middleware is transparent to error handling: a handler error is logged
//! as the event's error and then re-raised unchanged to the outer pipeline.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use serde_json::Value;
use tracing::Level;

use crate::diagnostic::{DiagnosticCollector, DiagnosticContext};
use crate::errors::{BoxError, CapturedError, ConfigError};
use crate::event::LogEvent;
use crate::request::RequestInfo;
use crate::target::LogTarget;
use crate::template::MessageTemplate;

use super::{BoxFuture, Middleware, MiddlewareFuture, Next};

/// Default completion message template.
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "HTTP {RequestMethod} {RequestPath} responded {StatusCode} in {Elapsed:0.0000} ms";

/// Computes the event severity from the request, its status code, elapsed
/// milliseconds, and the error if any.
pub type LevelSelector = dyn Fn(&RequestInfo, u16, f64, Option<&CapturedError>) -> Level + Send + Sync;

/// Computes the fixed request-outcome properties from the request, the logged
/// path, elapsed milliseconds, and the status code.
pub type OutcomeProperties = dyn Fn(&RequestInfo, &str, f64, u16) -> Vec<(String, Value)> + Send + Sync;

/// Synchronous enrichment hook, run against the still-open context just
/// before it is completed.
pub type EnrichHook = dyn Fn(&DiagnosticContext, &RequestInfo) -> Result<(), BoxError> + Send + Sync;

/// Asynchronous enrichment hook, awaited after the synchronous one.
pub type EnrichAsyncHook = dyn Fn(Arc<DiagnosticContext>, RequestInfo) -> BoxFuture<'static, Result<(), BoxError>>
    + Send
    + Sync;

/// Options for [`RequestLoggingMiddleware`].
///
/// Every required field carries a default; construction fails only when the
/// message template is blank or unparseable.
pub struct RequestLoggingOptions {
    /// Completion message template. Placeholders may name outcome properties,
    /// properties contributed via the diagnostic context, or both.
    pub message_template: String,
    /// Severity selector. Defaults to error level when an error occurred or
    /// the status code is above 499, info level otherwise.
    pub get_level: Arc<LevelSelector>,
    /// Outcome property function. Defaults to emitting `RequestMethod`,
    /// `RequestPath`, `StatusCode` and `Elapsed`.
    pub get_outcome_properties: Arc<OutcomeProperties>,
    /// Optional synchronous enrichment hook.
    pub enrich: Option<Arc<EnrichHook>>,
    /// Optional asynchronous enrichment hook.
    pub enrich_async: Option<Arc<EnrichAsyncHook>>,
    /// Target override; falls back to the process-wide shared target.
    pub logger: Option<Arc<dyn LogTarget>>,
    /// Include the query string in the logged request path.
    pub include_query_in_request_path: bool,
}

impl Default for RequestLoggingOptions {
    fn default() -> Self {
        Self {
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            get_level: Arc::new(default_get_level),
            get_outcome_properties: Arc::new(default_outcome_properties),
            enrich: None,
            enrich_async: None,
            logger: None,
            include_query_in_request_path: false,
        }
    }
}

impl RequestLoggingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the completion message template.
    pub fn message_template<S: Into<String>>(mut self, template: S) -> Self {
        self.message_template = template.into();
        self
    }

    /// Replace the severity selector.
    pub fn level_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&RequestInfo, u16, f64, Option<&CapturedError>) -> Level + Send + Sync + 'static,
    {
        self.get_level = Arc::new(selector);
        self
    }

    /// Replace the outcome property function.
    pub fn outcome_properties<F>(mut self, properties: F) -> Self
    where
        F: Fn(&RequestInfo, &str, f64, u16) -> Vec<(String, Value)> + Send + Sync + 'static,
    {
        self.get_outcome_properties = Arc::new(properties);
        self
    }

    /// Install a synchronous enrichment hook.
    pub fn enrich_with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DiagnosticContext, &RequestInfo) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.enrich = Some(Arc::new(hook));
        self
    }

    /// Install an asynchronous enrichment hook.
    pub fn enrich_with_async<F>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<DiagnosticContext>, RequestInfo) -> BoxFuture<'static, Result<(), BoxError>>
            + Send
            + Sync
            + 'static,
    {
        self.enrich_async = Some(Arc::new(hook));
        self
    }

    /// Log to a dedicated target instead of the process-wide shared one.
    pub fn logger(mut self, logger: Arc<dyn LogTarget>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Include the query string in the logged request path.
    pub fn include_query_in_request_path(mut self, include: bool) -> Self {
        self.include_query_in_request_path = include;
        self
    }
}

fn default_get_level(
    _info: &RequestInfo,
    status: u16,
    _elapsed_ms: f64,
    error: Option<&CapturedError>,
) -> Level {
    if error.is_some() || status > 499 {
        Level::ERROR
    } else {
        Level::INFO
    }
}

fn default_outcome_properties(
    info: &RequestInfo,
    path: &str,
    elapsed_ms: f64,
    status: u16,
) -> Vec<(String, Value)> {
    vec![
        ("RequestMethod".to_string(), Value::from(info.method.as_str())),
        ("RequestPath".to_string(), Value::from(path)),
        ("StatusCode".to_string(), Value::from(status)),
        ("Elapsed".to_string(), Value::from(elapsed_ms)),
    ]
}

/// Middleware that logs one completion event per request.
#[derive(Clone)]
pub struct RequestLoggingMiddleware {
    template: Arc<MessageTemplate>,
    get_level: Arc<LevelSelector>,
    get_outcome_properties: Arc<OutcomeProperties>,
    enrich: Option<Arc<EnrichHook>>,
    enrich_async: Option<Arc<EnrichAsyncHook>>,
    logger: Option<Arc<dyn LogTarget>>,
    include_query_in_request_path: bool,
}

impl RequestLoggingMiddleware {
    /// Create the middleware with default options.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_options(RequestLoggingOptions::default())
    }

    /// Create the middleware from options, parsing the message template once.
    pub fn with_options(options: RequestLoggingOptions) -> Result<Self, ConfigError> {
        let template = Arc::new(MessageTemplate::parse(&options.message_template)?);

        Ok(Self {
            template,
            get_level: options.get_level,
            get_outcome_properties: options.get_outcome_properties,
            enrich: options.enrich,
            enrich_async: options.enrich_async,
            logger: options.logger,
            include_query_in_request_path: options.include_query_in_request_path,
        })
    }

    fn resolved_logger(&self) -> Arc<dyn LogTarget> {
        self.logger
            .clone()
            .unwrap_or_else(crate::target::shared_target)
    }

    async fn log_completion(
        &self,
        info: &RequestInfo,
        context: &Arc<DiagnosticContext>,
        collector: &mut DiagnosticCollector,
        status: u16,
        elapsed_ms: f64,
        error: Option<CapturedError>,
    ) {
        let level = (self.get_level)(info, status, elapsed_ms, error.as_ref());
        let logger = self.resolved_logger();

        // Performance short-circuit: when the target is disabled for this
        // severity, enrichment hooks must not run at all. The collector is
        // still disposed by its Drop impl.
        if !logger.is_enabled(level) {
            return;
        }

        if let Some(enrich) = &self.enrich {
            if let Err(hook_error) = enrich(context, info) {
                tracing::debug!(target: "logbook", error = %hook_error, "enrichment hook failed");
            }
        }
        if let Some(enrich) = &self.enrich_async {
            if let Err(hook_error) = enrich(Arc::clone(context), info.clone()).await {
                tracing::debug!(target: "logbook", error = %hook_error, "async enrichment hook failed");
            }
        }

        let (mut properties, collected_error) = collector.complete().unwrap_or_default();

        let path = info.logged_path(self.include_query_in_request_path);
        // Outcome properties are merged last so they override any collected
        // property of the same name.
        for (name, value) in (self.get_outcome_properties)(info, path, elapsed_ms, status) {
            properties.insert(name, value);
        }

        let event = LogEvent {
            timestamp: chrono::Utc::now(),
            level,
            error: error.or(collected_error),
            template: Arc::clone(&self.template),
            properties,
        };

        logger.write(&event);
    }
}

impl Middleware for RequestLoggingMiddleware {
    fn handle(&self, mut request: Request, next: Next) -> MiddlewareFuture {
        let middleware = self.clone();
        Box::pin(async move {
            let start = Instant::now();
            let info = RequestInfo::capture(&request);

            let context = Arc::new(DiagnosticContext::new());
            let mut collector = DiagnosticContext::begin_collection(&context);
            request.extensions_mut().insert(Arc::clone(&context));

            let outcome = next.run(request).await;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            match outcome {
                Ok(response) => {
                    let status = response.status().as_u16();
                    middleware
                        .log_completion(&info, &context, &mut collector, status, elapsed_ms, None)
                        .await;
                    Ok(response)
                }
                Err(error) => {
                    // Log with the error attached, then re-raise the same
                    // error object unchanged.
                    middleware
                        .log_completion(
                            &info,
                            &context,
                            &mut collector,
                            500,
                            elapsed_ms,
                            Some(error.shared()),
                        )
                        .await;
                    Err(error)
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "RequestLoggingMiddleware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_template_fails_construction() {
        let options = RequestLoggingOptions::new().message_template("  ");
        assert!(matches!(
            RequestLoggingMiddleware::with_options(options),
            Err(ConfigError::MissingMessageTemplate)
        ));
    }

    #[test]
    fn default_level_selection() {
        let info = RequestInfo {
            method: axum::http::Method::GET,
            path: "/".to_string(),
            raw_path: "/".to_string(),
            raw_target: "/".to_string(),
        };
        assert_eq!(default_get_level(&info, 200, 1.0, None), Level::INFO);
        assert_eq!(default_get_level(&info, 404, 1.0, None), Level::INFO);
        assert_eq!(default_get_level(&info, 500, 1.0, None), Level::ERROR);

        let error: CapturedError =
            Arc::new(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(default_get_level(&info, 200, 1.0, Some(&error)), Level::ERROR);
    }

    #[test]
    fn default_outcome_property_names() {
        let info = RequestInfo {
            method: axum::http::Method::POST,
            path: "/items".to_string(),
            raw_path: "/items".to_string(),
            raw_target: "/items?all=1".to_string(),
        };
        let properties = default_outcome_properties(&info, "/items", 3.5, 201);
        let names: Vec<&str> = properties.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec!["RequestMethod", "RequestPath", "StatusCode", "Elapsed"]
        );
        assert_eq!(properties[0].1, Value::from("POST"));
        assert_eq!(properties[2].1, Value::from(201));
    }
}
