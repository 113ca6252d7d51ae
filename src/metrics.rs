use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hooks for counting store activity.
///
/// Implementations are notified after each mutation or cursor page has been
/// applied against the backing store.
pub trait StoreMetrics: Send + Sync {
    /// A node row was inserted.
    fn node_created(&self);

    /// A node row was deleted.
    fn node_removed(&self);

    /// An edge row was inserted.
    fn edge_created(&self);

    /// An edge row was deleted, directly or by cascade.
    fn edge_removed(&self);

    /// Attribute rows were written.
    fn feature_rows_written(&self, rows: usize);

    /// Attribute rows were deleted because the value was unknown or a closed default.
    fn feature_rows_suppressed(&self, rows: usize);

    /// A cursor fetched one page of rows.
    ///
    /// # Parameters
    /// * `rows` - Number of rows the page contained.
    fn cursor_page(&self, rows: usize);

    /// An event was delivered to the listener bus.
    fn event_dispatched(&self);
}

/// A no-op implementation of [`StoreMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl StoreMetrics for NoopMetrics {
    fn node_created(&self) {}
    fn node_removed(&self) {}
    fn edge_created(&self) {}
    fn edge_removed(&self) {}
    fn feature_rows_written(&self, _rows: usize) {}
    fn feature_rows_suppressed(&self, _rows: usize) {}
    fn cursor_page(&self, _rows: usize) {}
    fn event_dispatched(&self) {}
}

/// Atomic counter implementation of [`StoreMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Number of nodes created.
    pub nodes_created: AtomicU64,

    /// Number of nodes removed.
    pub nodes_removed: AtomicU64,

    /// Number of edges created.
    pub edges_created: AtomicU64,

    /// Number of edges removed.
    pub edges_removed: AtomicU64,

    /// Number of attribute rows written.
    pub feature_rows_written: AtomicU64,

    /// Number of attribute writes that resolved to a row deletion.
    pub feature_rows_suppressed: AtomicU64,

    /// Number of cursor pages fetched.
    pub cursor_pages: AtomicU64,

    /// Number of rows delivered through cursor pages.
    pub cursor_rows: AtomicU64,

    /// Number of events dispatched.
    pub events_dispatched: AtomicU64,
}

impl StoreMetrics for CounterMetrics {
    fn node_created(&self) {
        self.nodes_created.fetch_add(1, Ordering::Relaxed);
    }

    fn node_removed(&self) {
        self.nodes_removed.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_created(&self) {
        self.edges_created.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_removed(&self) {
        self.edges_removed.fetch_add(1, Ordering::Relaxed);
    }

    fn feature_rows_written(&self, rows: usize) {
        self.feature_rows_written
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    fn feature_rows_suppressed(&self, rows: usize) {
        self.feature_rows_suppressed
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    fn cursor_page(&self, rows: usize) {
        self.cursor_pages.fetch_add(1, Ordering::Relaxed);
        self.cursor_rows.fetch_add(rows as u64, Ordering::Relaxed);
    }

    fn event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation, [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn StoreMetrics> {
    Arc::new(NoopMetrics)
}
