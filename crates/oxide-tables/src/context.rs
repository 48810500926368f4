//! Per-caller schema context.
//!
//! A [`SchemaContext`] owns the handle to the schema inspector. Callers build
//! one and pass it to [`TableModel`](crate::TableModel); nothing is global.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

use crate::inspector::{InspectorError, SchemaInspector};

type Connector =
    Box<dyn Fn() -> Result<Arc<dyn SchemaInspector>, InspectorError> + Send + Sync>;

/// Lazily connected access to the live schema.
///
/// The connector runs at most once successfully, even under concurrent first
/// use. A failed connect is not cached; the next call tries again.
pub struct SchemaContext {
    connector: Connector,
    inspector: OnceLock<Arc<dyn SchemaInspector>>,
    init: Mutex<()>,
}

impl SchemaContext {
    /// Creates a context that connects on first use.
    pub fn new<F>(connector: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SchemaInspector>, InspectorError> + Send + Sync + 'static,
    {
        Self {
            connector: Box::new(connector),
            inspector: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Creates a context around an already connected inspector.
    pub fn with_inspector(inspector: Arc<dyn SchemaInspector>) -> Self {
        let context = Self::new(|| {
            Err(InspectorError::Backend(
                "inspector was provided up front".to_string(),
            ))
        });
        let _ = context.inspector.set(inspector);
        context
    }

    /// Returns the inspector, connecting first if needed.
    pub fn inspector(&self) -> Result<Arc<dyn SchemaInspector>, InspectorError> {
        if let Some(inspector) = self.inspector.get() {
            return Ok(Arc::clone(inspector));
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(inspector) = self.inspector.get() {
            return Ok(Arc::clone(inspector));
        }

        debug!("connecting schema inspector");
        let inspector = (self.connector)()?;
        let _ = self.inspector.set(Arc::clone(&inspector));
        Ok(inspector)
    }

    /// Returns whether the inspector is already connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inspector.get().is_some()
    }
}

impl fmt::Debug for SchemaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaContext")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::inspector::MemoryInspector;

    #[test]
    fn test_with_inspector() {
        let context = SchemaContext::with_inspector(Arc::new(MemoryInspector::new()));
        assert!(context.is_connected());
        assert!(context.inspector().is_ok());
    }

    #[test]
    fn test_connects_once_under_concurrency() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let context = SchemaContext::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryInspector::new()) as Arc<dyn SchemaInspector>)
        });
        assert!(!context.is_connected());

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    assert!(context.inspector().is_ok());
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(context.is_connected());
    }

    #[test]
    fn test_failed_connect_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let context = SchemaContext::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(InspectorError::Backend("connection refused".to_string()))
            } else {
                Ok(Arc::new(MemoryInspector::new()) as Arc<dyn SchemaInspector>)
            }
        });

        assert!(matches!(
            context.inspector(),
            Err(InspectorError::Backend(_))
        ));
        assert!(!context.is_connected());
        assert!(context.inspector().is_ok());
        assert!(context.inspector().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
