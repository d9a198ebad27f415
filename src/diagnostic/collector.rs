//! Collection handle owned by the request logging middleware

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::CapturedError;

use super::DiagnosticContext;

/// Owns the collection opened by
/// [`DiagnosticContext::begin_collection`](super::DiagnosticContext::begin_collection).
///
/// Exactly one collector exists per open collection. Dropping the collector
/// disposes the collection, so every middleware exit path releases it even
/// when completion was never reached.
#[derive(Debug)]
pub struct DiagnosticCollector {
    context: Arc<DiagnosticContext>,
    detached: bool,
}

impl DiagnosticCollector {
    pub(crate) fn new(context: Arc<DiagnosticContext>) -> Self {
        Self {
            context,
            detached: false,
        }
    }

    /// Atomically detach the collection and return its accumulated
    /// properties and captured error. Further `set`/`set_error` calls on the
    /// context become no-ops.
    ///
    /// Returns `None` if the collection was already completed or disposed;
    /// callers treat that as "nothing collected".
    #[allow(clippy::type_complexity)]
    pub fn complete(&mut self) -> Option<(HashMap<String, Value>, Option<CapturedError>)> {
        if self.detached {
            return None;
        }
        self.detached = true;
        self.context
            .take_collection()
            .map(|collection| (collection.properties, collection.error))
    }

    /// Release the collection without harvesting it. Idempotent, and a safe
    /// no-op after [`complete`](Self::complete).
    pub fn dispose(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        self.context.take_collection();
    }
}

impl Drop for DiagnosticCollector {
    fn drop(&mut self) {
        self.dispose();
    }
}
