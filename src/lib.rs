//! A typed property graph stored in relational tables.
//!
//! A [`GraphStore`] persists nodes, directed edges, undirected edges and a
//! singleton graph item in an embedded SQLite database. Every item belongs to
//! a [`Schema`] registered at runtime; each schema gets its own attribute
//! table holding the item's [`FeatureValue`]s. Navigation (adjacency,
//! incidence, role queries) returns lazy [`ItemCursor`]s, and mutations are
//! announced to registered [`GraphListener`]s.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod metrics;
pub mod options;
pub mod schema;
pub mod storage;
pub mod types;
pub mod value;

pub use error::{GraphError, ListenerError, Result};
pub use metrics::{default_metrics, CounterMetrics, NoopMetrics, StoreMetrics};
pub use options::{JournalMode, StoreOptions, SyncMode, DEFAULT_CURSOR_BATCH};
pub use schema::{FeatureEntry, Schema};
pub use storage::{
    DirectedEdge, Edge, FeatureOwner, FromRow, GraphEvent, GraphItem, GraphListener, GraphStore,
    HasFeatures, Item, ItemCursor, ListenerId, Node, UndirectedEdge,
};
pub use types::{validate_schema_id, GraphId, ItemId, Rid, Role, SchemaKind, GRAPH_RID};
pub use value::{CategValue, FeatureDef, FeatureKind, FeatureValue, MultiCategValue, StoredValue};
