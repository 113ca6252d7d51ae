//! Graph storage engine backed by relational tables.
//!
//! Topology lives in three base tables (`nodes`, `edges`, `edge_incidence`);
//! feature values live in one attribute table per registered schema. All
//! navigation is expressed as parameterized queries and read through lazy
//! [`ItemCursor`]s.

mod backing;
mod cursor;
pub(crate) mod ddl;
mod events;
mod item;
mod query;
mod store;

/// Lazy cursors over query results.
pub use cursor::{FromRow, ItemCursor, ItemRow};

/// Mutation events and listeners.
pub use events::{FeatureOwner, GraphEvent, GraphListener, ListenerId};

/// Item handles.
pub use item::{DirectedEdge, Edge, GraphItem, HasFeatures, Item, Node, UndirectedEdge};

/// The store façade.
pub use store::GraphStore;
