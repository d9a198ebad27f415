//! # logbook
//!
//! Structured per-request completion logging for axum-based HTTP pipelines.
//!
//! Instead of scattering many fragmented log lines across a request's
//! lifetime, `logbook` collects everything into a single structured event
//! emitted once, at request completion:
//!
//! - A request-scoped [`DiagnosticContext`] lets any code handling the
//!   request, including sub-tasks it spawns, contribute key/value properties
//!   and an error to the eventual event.
//! - [`RequestLoggingMiddleware`] wraps the downstream handler, measures
//!   elapsed time on a monotonic clock, resolves a severity, merges collected
//!   properties with the request outcome, and writes exactly one event
//!   whether the handler succeeded or raised an error. Handler errors are
//!   re-raised unchanged.
//!
//! ```no_run
//! use axum::body::Body;
//! use axum::response::Response;
//! use logbook::diagnostic::DiagnosticContext;
//! use logbook::middleware::{MiddlewarePipeline, RequestLoggingMiddleware};
//!
//! # async fn demo(request: axum::extract::Request) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = MiddlewarePipeline::new().add(RequestLoggingMiddleware::new()?);
//!
//! let _response = pipeline
//!     .execute(request, |req| async move {
//!         if let Some(context) = DiagnosticContext::from_request(&req) {
//!             context.set("UserId", 42);
//!         }
//!         Ok(Response::new(Body::empty()))
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod diagnostic;
pub mod errors;
pub mod event;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod target;
pub mod template;

pub use diagnostic::{DiagnosticCollector, DiagnosticContext};
pub use errors::{BoxError, CapturedError, ConfigError, HandlerError};
pub use event::LogEvent;
pub use logging::{init_logging, LoggingConfig};
pub use middleware::{
    HandlerResult, Middleware, MiddlewareFuture, MiddlewarePipeline, Next,
    RequestLoggingMiddleware, RequestLoggingOptions,
};
pub use request::RequestInfo;
pub use target::{set_shared_target, shared_target, LogTarget, TracingTarget, EVENT_TARGET};
pub use template::MessageTemplate;
