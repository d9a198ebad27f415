//! # Middleware Pipeline
//!
//! A `handle(request, next)` middleware system over fallible handlers.
//! `Next` represents the rest of the chain; a handler either produces a
//! response or raises a [`HandlerError`], and middleware see both outcomes.

pub mod request_logging;

pub use request_logging::{RequestLoggingMiddleware, RequestLoggingOptions};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;

use crate::errors::HandlerError;

/// Type alias for boxed futures used throughout the pipeline.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a downstream handler.
pub type HandlerResult = Result<Response, HandlerError>;

/// Future returned by middleware and `Next`.
pub type MiddlewareFuture = BoxFuture<'static, HandlerResult>;

/// The rest of the middleware chain.
pub struct Next {
    handler: Box<dyn FnOnce(Request) -> MiddlewareFuture + Send>,
}

impl Next {
    /// Create a new `Next` with a handler function.
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(Request) -> MiddlewareFuture + Send + 'static,
    {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Run the rest of the chain with the given request.
    pub async fn run(self, request: Request) -> HandlerResult {
        (self.handler)(request).await
    }
}

/// Middleware with the `handle(request, next)` pattern.
pub trait Middleware: Send + Sync {
    /// Handle the request and call the next middleware in the chain.
    fn handle(&self, request: Request, next: Next) -> MiddlewareFuture;

    /// Optional middleware name for debugging.
    fn name(&self) -> &'static str {
        "Middleware"
    }
}

/// An ordered middleware chain composed around a final handler.
#[derive(Default)]
pub struct MiddlewarePipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware to the pipeline.
    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Add an already-shared middleware to the pipeline.
    pub fn add_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Execute the pipeline around a final handler.
    pub async fn execute<F, Fut>(&self, request: Request, handler: F) -> HandlerResult
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let mut chain = Box::new(move |req: Request| Box::pin(handler(req)) as MiddlewareFuture)
            as Box<dyn FnOnce(Request) -> MiddlewareFuture + Send>;

        for middleware in self.middleware.iter().rev() {
            let middleware = Arc::clone(middleware);
            let next_handler = chain;
            chain = Box::new(move |req: Request| {
                let next = Next::new(next_handler);
                middleware.handle(req, next)
            });
        }

        chain(request).await
    }

    /// Number of middleware in the pipeline.
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Whether the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Middleware names for debugging.
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}

impl Clone for MiddlewarePipeline {
    fn clone(&self) -> Self {
        Self {
            middleware: self.middleware.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, StatusCode};

    struct HeaderStamp {
        name: &'static str,
    }

    impl Middleware for HeaderStamp {
        fn handle(&self, mut request: Request, next: Next) -> MiddlewareFuture {
            let name = self.name;
            Box::pin(async move {
                request
                    .headers_mut()
                    .insert(name, "executed".parse().unwrap());
                next.run(request).await
            })
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn request() -> Request {
        Request::builder()
            .method(Method::GET)
            .uri("/test")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn middleware_run_in_registration_order() {
        let pipeline = MiddlewarePipeline::new()
            .add(HeaderStamp { name: "x-first" })
            .add(HeaderStamp { name: "x-second" });

        let response = pipeline
            .execute(request(), |req| async move {
                assert!(req.headers().contains_key("x-first"));
                assert!(req.headers().contains_key("x-second"));
                Ok(Response::new(Body::empty()))
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn handler_errors_pass_through_the_chain() {
        let pipeline = MiddlewarePipeline::new().add(HeaderStamp { name: "x-any" });

        let outcome = pipeline
            .execute(request(), |_req| async move {
                Err(HandlerError::msg("downstream failed"))
            })
            .await;

        assert_eq!(outcome.unwrap_err().to_string(), "downstream failed");
    }

    #[tokio::test]
    async fn pipeline_introspection() {
        let pipeline = MiddlewarePipeline::new()
            .add(HeaderStamp { name: "x-a" })
            .add(HeaderStamp { name: "x-b" });

        assert_eq!(pipeline.len(), 2);
        assert!(!pipeline.is_empty());
        assert_eq!(pipeline.names(), vec!["x-a", "x-b"]);
        assert!(MiddlewarePipeline::new().is_empty());
    }
}
