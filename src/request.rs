//! Request snapshot used by completion logging
//!
//! The middleware captures an immutable view of the request before handing it
//! to the downstream handler, so the completion event can be built after the
//! request itself has been consumed by the pipeline.

use axum::extract::Request;
use axum::http::Method;

/// Immutable facts about an in-flight request, captured before the downstream
/// handler runs.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// HTTP method.
    pub method: Method,
    /// Normalized request path.
    pub path: String,
    /// Raw request path as received, may be empty for synthetic requests.
    pub raw_path: String,
    /// Raw request target including the query string.
    pub raw_target: String,
}

impl RequestInfo {
    /// Snapshot the parts of the request that completion logging needs.
    pub fn capture(request: &Request) -> Self {
        let uri = request.uri();
        let raw_target = uri
            .path_and_query()
            .map(|target| target.as_str().to_string())
            .unwrap_or_default();

        Self {
            method: request.method().clone(),
            path: uri.path().to_string(),
            raw_path: uri.path().to_string(),
            raw_target,
        }
    }

    /// The path that should appear in the completion event.
    ///
    /// Uses the raw form when available, falling back to the normalized path
    /// when the raw form is empty (some test harnesses produce requests with
    /// an empty raw path). With `include_query` the raw target (path plus
    /// query string) is used instead.
    pub fn logged_path(&self, include_query: bool) -> &str {
        let raw = if include_query {
            &self.raw_target
        } else {
            &self.raw_path
        };

        if raw.is_empty() {
            &self.path
        } else {
            raw
        }
    }
}
