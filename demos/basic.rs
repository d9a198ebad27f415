//! Runs a couple of requests through a pipeline with completion logging and
//! prints the resulting events via the default tracing target.
//!
//! ```sh
//! cargo run --example basic
//! ```

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::Response;

use logbook::{
    init_logging, DiagnosticContext, HandlerError, LoggingConfig, MiddlewarePipeline,
    RequestLoggingMiddleware, RequestLoggingOptions,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging(LoggingConfig::development())?;

    let options = RequestLoggingOptions::new().enrich_with(|context, info| {
        context.set("Endpoint", info.path.as_str());
        Ok(())
    });
    let pipeline = MiddlewarePipeline::new().add(RequestLoggingMiddleware::with_options(options)?);

    // A request that succeeds, contributing a property from the handler.
    let request = Request::builder()
        .method(Method::GET)
        .uri("/orders?page=2")
        .body(Body::empty())?;
    let response = pipeline
        .execute(request, |req| async move {
            if let Some(context) = DiagnosticContext::from_request(&req) {
                context.set("OrderCount", 17);
            }
            Ok(Response::new(Body::from("orders")))
        })
        .await;
    println!("first request: {:?}", response.map(|r| r.status()));

    // A request whose handler raises; the completion event carries the error
    // and the error still reaches us here.
    let request = Request::builder()
        .method(Method::POST)
        .uri("/orders")
        .body(Body::empty())?;
    let outcome = pipeline
        .execute(request, |_req| async move {
            Err::<Response, _>(HandlerError::msg("inventory unavailable"))
        })
        .await;
    println!("second request: {}", outcome.unwrap_err());

    // A handler can also report a failure without raising it.
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())?;
    let response = pipeline
        .execute(request, |req| async move {
            if let Some(context) = DiagnosticContext::from_request(&req) {
                context.set_error(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "replica lag above threshold",
                ));
            }
            let mut response = Response::new(Body::from("degraded"));
            *response.status_mut() = StatusCode::OK;
            Ok(response)
        })
        .await;
    println!("third request: {:?}", response.map(|r| r.status()));

    Ok(())
}
