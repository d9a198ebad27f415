//! # Diagnostic Context
//!
//! A request-scoped property accumulator. The request logging middleware
//! opens one collection per request and stores the context in the request's
//! extensions, so handler code and any sub-tasks it spawns (holding a cloned
//! `Arc`) can contribute properties to the single completion event from
//! anywhere in the call graph.
//!
//! Writes are last-write-wins per key and only land while a collection is
//! open; writes before opening or after completion are silent no-ops, so
//! late-finishing background writers are always safe.

pub mod collector;

pub use collector::DiagnosticCollector;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::Request;
use serde::Serialize;
use serde_json::Value;

use crate::errors::CapturedError;

/// Request-scoped diagnostic property bag.
///
/// One instance exists per in-flight request; isolation across concurrent
/// requests follows from each request owning its own context. Within a
/// request, each write is atomic under an internal mutex.
#[derive(Debug, Default)]
pub struct DiagnosticContext {
    slot: Mutex<CollectionSlot>,
}

#[derive(Debug, Default)]
pub(crate) struct Collection {
    pub(crate) properties: HashMap<String, Value>,
    pub(crate) error: Option<CapturedError>,
}

#[derive(Debug, Default)]
enum CollectionSlot {
    #[default]
    Idle,
    Open(Collection),
    Closed,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve the context the middleware stored in the request's
    /// extensions, if request logging is active for this request.
    pub fn from_request(request: &Request) -> Option<Arc<DiagnosticContext>> {
        request.extensions().get::<Arc<DiagnosticContext>>().cloned()
    }

    /// Open a collection on this context.
    ///
    /// # Panics
    ///
    /// Panics if a collection is already open: collections must not nest, and
    /// silently ignoring the second open would mask a real pipeline bug.
    pub fn begin_collection(context: &Arc<DiagnosticContext>) -> DiagnosticCollector {
        {
            let mut slot = context.lock();
            if matches!(*slot, CollectionSlot::Open(_)) {
                panic!("diagnostic collection is already open; collections must not be nested");
            }
            *slot = CollectionSlot::Open(Collection::default());
        }
        DiagnosticCollector::new(Arc::clone(context))
    }

    /// Upsert a property on the open collection; last write wins per key.
    ///
    /// A silent no-op when no collection is open, and when the value cannot
    /// be represented as JSON. Diagnostic writers must be safe to call
    /// outside request scope.
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Serialize,
    {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        let mut slot = self.lock();
        if let CollectionSlot::Open(collection) = &mut *slot {
            collection.properties.insert(key.into(), value);
        }
    }

    /// Store an error on the open collection, overwriting any previous one.
    /// Independent of [`set`](Self::set); a no-op when no collection is open.
    pub fn set_error<E>(&self, error: E)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.set_error_arc(Arc::new(error));
    }

    /// [`set_error`](Self::set_error) for an already-shared error, preserving
    /// the original allocation.
    pub fn set_error_arc(&self, error: CapturedError) {
        let mut slot = self.lock();
        if let CollectionSlot::Open(collection) = &mut *slot {
            collection.error = Some(error);
        }
    }

    /// Detach the open collection, closing the context to further writes.
    pub(crate) fn take_collection(&self) -> Option<Collection> {
        let mut slot = self.lock();
        match std::mem::replace(&mut *slot, CollectionSlot::Closed) {
            CollectionSlot::Open(collection) => Some(collection),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CollectionSlot> {
        // A poisoned lock still holds a valid slot.
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_before_open_is_a_no_op() {
        let context = Arc::new(DiagnosticContext::new());
        context.set("Early", 1);

        let mut collector = DiagnosticContext::begin_collection(&context);
        let (properties, _) = collector.complete().unwrap();
        assert!(properties.is_empty());
    }

    #[test]
    fn last_write_wins_per_key() {
        let context = Arc::new(DiagnosticContext::new());
        let mut collector = DiagnosticContext::begin_collection(&context);

        context.set("Key", 1);
        context.set("Key", 2);
        context.set("Other", "kept");

        let (properties, _) = collector.complete().unwrap();
        assert_eq!(properties.get("Key"), Some(&json!(2)));
        assert_eq!(properties.get("Other"), Some(&json!("kept")));
    }

    #[test]
    fn set_after_complete_never_affects_the_snapshot() {
        let context = Arc::new(DiagnosticContext::new());
        let mut collector = DiagnosticContext::begin_collection(&context);
        context.set("Key", 1);

        let (properties, _) = collector.complete().unwrap();
        context.set("Key", 99);
        context.set("Late", true);
        context.set_error(std::io::Error::new(std::io::ErrorKind::Other, "late"));

        assert_eq!(properties.get("Key"), Some(&json!(1)));
        assert_eq!(properties.len(), 1);
    }

    #[test]
    fn error_slot_is_independent_of_properties() {
        let context = Arc::new(DiagnosticContext::new());
        let mut collector = DiagnosticContext::begin_collection(&context);

        context.set_error(std::io::Error::new(std::io::ErrorKind::Other, "first"));
        context.set_error(std::io::Error::new(std::io::ErrorKind::Other, "second"));

        let (properties, error) = collector.complete().unwrap();
        assert!(properties.is_empty());
        assert_eq!(error.unwrap().to_string(), "second");
    }

    #[test]
    #[should_panic(expected = "must not be nested")]
    fn nested_collections_are_a_defect() {
        let context = Arc::new(DiagnosticContext::new());
        let _outer = DiagnosticContext::begin_collection(&context);
        let _inner = DiagnosticContext::begin_collection(&context);
    }

    #[test]
    fn reopening_after_close_starts_fresh() {
        let context = Arc::new(DiagnosticContext::new());

        let mut first = DiagnosticContext::begin_collection(&context);
        context.set("A", 1);
        first.complete().unwrap();

        let mut second = DiagnosticContext::begin_collection(&context);
        context.set("B", 2);
        let (properties, _) = second.complete().unwrap();

        assert_eq!(properties.len(), 1);
        assert_eq!(properties.get("B"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn concurrent_writers_from_one_request_all_land() {
        let context = Arc::new(DiagnosticContext::new());
        let mut collector = DiagnosticContext::begin_collection(&context);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let context = Arc::clone(&context);
            tasks.push(tokio::spawn(async move {
                context.set(format!("Key{i}"), i);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let (properties, _) = collector.complete().unwrap();
        assert_eq!(properties.len(), 8);
        for i in 0..8 {
            assert_eq!(properties.get(&format!("Key{i}")), Some(&json!(i)));
        }
    }
}
