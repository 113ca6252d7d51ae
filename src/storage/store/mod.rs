//! The graph store façade.
//!
//! `GraphStore` coordinates the backing connection, the schema registry, the
//! row-id sequences and the listener bus. Its operations are split by concern
//! across the `*_ops.rs` files of this module.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use rusqlite::params_from_iter;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::metrics::{default_metrics, StoreMetrics};
use crate::options::StoreOptions;
use crate::schema::Schema;
use crate::types::{GraphId, ItemId, Rid, SchemaKind};

use super::backing::Backing;
use super::cursor::{FromRow, ItemCursor};
use super::ddl;
use super::events::{GraphEvent, GraphListener, ListenerBus, ListenerId};
use super::item::GraphItem;
use super::query::ItemQuery;

mod bulk_ops;
mod edge_ops;
mod feature_ops;
mod node_ops;
mod schema_ops;


/// A typed property graph persisted in relational tables.
///
/// The store owns one backing connection, opened on first use. It is meant
/// for a single logical writer and is neither `Send` nor `Sync`; callers that
/// share one across threads must serialize access themselves.
///
/// # Examples
///
/// ```
/// use relgraph::{FeatureDef, FeatureKind, FeatureValue, GraphId, GraphStore, HasFeatures};
/// use relgraph::{Schema, SchemaKind, StoreOptions};
///
/// # fn main() -> relgraph::Result<()> {
/// let store = GraphStore::open(StoreOptions::new(GraphId::new("social", "demo")?))?;
/// store.add_schema(
///     "person",
///     Schema::new(SchemaKind::Node).with_feature("age", FeatureDef::open(FeatureKind::Numeric)),
/// )?;
/// let alice = store.add_node(&store.item_id("person", "alice")?)?;
/// alice.set_feature_value("age", FeatureValue::numeric(42.0))?;
/// assert_eq!(alice.get_feature_value("age")?, FeatureValue::numeric(42.0));
/// # Ok(())
/// # }
/// ```
pub struct GraphStore {
    graph_id: GraphId,
    backing: Backing,
    schemas: RefCell<FxHashMap<String, Rc<Schema>>>,
    last_node_rid: Cell<i64>,
    last_edge_rid: Cell<i64>,
    listeners: RefCell<ListenerBus>,
    cursor_batch: usize,
    metrics: Arc<dyn StoreMetrics>,
    ready: Cell<bool>,
}

impl GraphStore {
    /// Builds a store from `options` without touching the backing file.
    ///
    /// The connection is opened, the schema registry loaded and the row-id
    /// sequences seeded on the first operation that needs them, or on
    /// [`connect`](Self::connect).
    pub fn open(options: StoreOptions) -> Result<Self> {
        options.validate()?;
        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        Ok(Self {
            graph_id: options.graph_id.clone(),
            backing: Backing::new(&options),
            schemas: RefCell::new(FxHashMap::default()),
            last_node_rid: Cell::new(0),
            last_edge_rid: Cell::new(0),
            listeners: RefCell::new(ListenerBus::default()),
            cursor_batch: options.cursor_batch,
            metrics,
            ready: Cell::new(false),
        })
    }

    /// Opens the backing connection now. Calling this again is a no-op.
    pub fn connect(&self) -> Result<()> {
        self.backing().map(|_| ())
    }

    /// Whether the backing connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.backing.is_connected()
    }

    /// Location of the database file; `None` until a fallback location has
    /// been created for a store opened without a path.
    pub fn location(&self) -> Option<PathBuf> {
        self.backing.location()
    }

    /// Identity of this store.
    pub fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    /// The singleton graph item.
    pub fn graph(&self) -> GraphItem<'_> {
        GraphItem::new(self)
    }

    /// Builds an identifier of this store for `schema_id.object_id`.
    pub fn item_id(&self, schema_id: &str, object_id: &str) -> Result<ItemId> {
        ItemId::new(self.graph_id.clone(), schema_id, object_id)
    }

    /// Registers `listener`; listeners run in registration order.
    pub fn add_listener<L>(&self, listener: L) -> ListenerId
    where
        L: GraphListener + 'static,
    {
        self.listeners.borrow_mut().add(Rc::new(listener))
    }

    /// Unregisters a listener. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(id)
    }

    pub(crate) fn backing(&self) -> Result<&Backing> {
        if !self.ready.get() {
            self.initialize()?;
        }
        Ok(&self.backing)
    }

    pub(crate) fn cursor_batch(&self) -> usize {
        self.cursor_batch
    }

    pub(crate) fn metrics(&self) -> &dyn StoreMetrics {
        self.metrics.as_ref()
    }

    pub(crate) fn same_store(&self, other: &GraphStore) -> bool {
        std::ptr::eq(self, other)
    }

    pub(crate) fn cursor<'g, T: FromRow<'g>>(&'g self, query: ItemQuery) -> ItemCursor<'g, T> {
        ItemCursor::new(self, query)
    }

    pub(crate) fn count(&self, query: &ItemQuery) -> Result<usize> {
        let sql = query.count_sql();
        let count: i64 = self
            .backing()?
            .query_row(&sql, params_from_iter(query.params().iter()), |row| row.get(0))?
            .unwrap_or(0);
        Ok(count_to_usize(count))
    }

    pub(crate) fn contains(&self, query: &ItemQuery, rid: Rid) -> Result<bool> {
        let sql = query.contains_sql();
        let params = query.contains_params(rid);
        Ok(self
            .backing()?
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?
            .unwrap_or(false))
    }

    pub(crate) fn scalar(&self, sql: &str, params: impl rusqlite::Params) -> Result<i64> {
        Ok(self
            .backing()?
            .query_row(sql, params, |row| row.get(0))?
            .unwrap_or(0))
    }

    pub(crate) fn has_listeners(&self) -> bool {
        !self.listeners.borrow().is_empty()
    }

    /// Delivers `event` to every listener, stopping at the first failure.
    pub(crate) fn fire(&self, event: GraphEvent) -> Result<()> {
        // Snapshot so listeners may (un)register listeners while running.
        let listeners = self.listeners.borrow().snapshot();
        for listener in listeners {
            self.metrics.event_dispatched();
            listener.on_event(&event).map_err(GraphError::Listener)?;
        }
        Ok(())
    }

    pub(crate) fn fire_all(&self, events: impl IntoIterator<Item = GraphEvent>) -> Result<()> {
        for event in events {
            self.fire(event)?;
        }
        Ok(())
    }

    /// Rejects identifiers minted for another store.
    pub(crate) fn check_graph(&self, id: &ItemId) -> Result<()> {
        if id.graph() != &self.graph_id {
            return Err(GraphError::WrongGraph {
                item: id.to_string(),
                expected: self.graph_id.clone(),
                found: id.graph().clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn next_node_rid(&self) -> Rid {
        let next = self.last_node_rid.get() + 1;
        self.last_node_rid.set(next);
        Rid(next)
    }

    pub(crate) fn next_edge_rid(&self) -> Rid {
        let next = self.last_edge_rid.get() + 1;
        self.last_edge_rid.set(next);
        Rid(next)
    }

    fn initialize(&self) -> Result<()> {
        let backing = &self.backing;
        backing.connect()?;
        let stored = backing.query(ddl::LOAD_SCHEMAS, [], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut schemas = FxHashMap::default();
        for (id, definition) in stored {
            let schema: Schema = serde_json::from_str(&definition)?;
            schemas.insert(id, Rc::new(schema));
        }

        let graph_schema = self.graph_id.schema_id();
        match schemas.get(graph_schema) {
            Some(schema) if schema.kind() != SchemaKind::Graph => {
                return Err(GraphError::TypeMismatch(format!(
                    "schema {graph_schema} of the store's graph id is a {} schema",
                    schema.kind()
                )));
            }
            Some(_) => {}
            None => {
                let schema = Schema::new(SchemaKind::Graph);
                self.install_schema(graph_schema, &schema)?;
                schemas.insert(graph_schema.to_owned(), Rc::new(schema));
            }
        }

        let last_node: i64 = backing
            .query_row(ddl::LAST_NODE_RID, [], |row| row.get(0))?
            .unwrap_or(0);
        let last_edge: i64 = backing
            .query_row(ddl::LAST_EDGE_RID, [], |row| row.get(0))?
            .unwrap_or(0);
        self.last_node_rid.set(last_node);
        self.last_edge_rid.set(last_edge);

        debug!(
            graph = %self.graph_id,
            schemas = schemas.len(),
            last_node,
            last_edge,
            "graph store initialized"
        );
        *self.schemas.borrow_mut() = schemas;
        self.ready.set(true);
        Ok(())
    }
}

pub(crate) fn count_to_usize(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}
