//! Handles over the items of a store.
//!
//! Handles are cheap views keyed by `(schema-id, object-id)`: equality and
//! hashing use only that pair, never the row id. Every navigation method
//! builds a query and returns a lazy [`ItemCursor`](super::ItemCursor).

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{GraphError, Result};
use crate::types::{ItemId, Rid, SchemaKind};
use crate::value::FeatureValue;

use super::cursor::{FromRow, ItemRow};
use super::events::FeatureOwner;
use super::query::ItemTable;
use super::GraphStore;

mod edge;
mod graph_item;
mod node;

pub use edge::{DirectedEdge, Edge, UndirectedEdge};
pub use graph_item::GraphItem;
pub use node::Node;

#[derive(Clone)]
pub(crate) struct ItemHandle<'g> {
    pub(crate) store: &'g GraphStore,
    pub(crate) schema_id: String,
    pub(crate) object_id: String,
    pub(crate) rid: Rid,
}

impl<'g> ItemHandle<'g> {
    pub(crate) fn new(store: &'g GraphStore, schema_id: String, object_id: String, rid: Rid) -> Self {
        Self {
            store,
            schema_id,
            object_id,
            rid,
        }
    }

    pub(crate) fn id(&self) -> ItemId {
        ItemId::from_parts(
            self.store.graph_id().clone(),
            self.schema_id.clone(),
            self.object_id.clone(),
        )
    }
}

impl PartialEq for ItemHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.schema_id == other.schema_id && self.object_id == other.object_id
    }
}

impl Eq for ItemHandle<'_> {}

impl Hash for ItemHandle<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema_id.hash(state);
        self.object_id.hash(state);
    }
}

impl fmt::Debug for ItemHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}#{}", self.schema_id, self.object_id, self.rid)
    }
}

/// Feature access shared by every item kind.
///
/// Values are read from and written to the attribute table of the item's
/// schema. Unknown values and closed defaults are never stored.
pub trait HasFeatures<'g> {
    /// Store the item lives in.
    fn store(&self) -> &'g GraphStore;

    /// Schema of the item.
    fn schema_id(&self) -> &str;

    /// Row id keying the item's attribute rows.
    fn rid(&self) -> Rid;

    /// Identity reported in [`crate::GraphEvent::FeatureSet`].
    fn owner(&self) -> FeatureOwner;

    /// Reads one value; a missing row yields the closed default or unknown.
    fn get_feature_value(&self, feature_id: &str) -> Result<FeatureValue> {
        self.store()
            .read_feature(self.schema_id(), self.rid(), feature_id)
    }

    /// Writes one value and notifies listeners.
    fn set_feature_value(&self, feature_id: &str, value: FeatureValue) -> Result<()> {
        self.store()
            .write_feature(self.owner(), self.schema_id(), self.rid(), feature_id, value)
    }

    /// Forgets the stored value of a feature.
    fn remove_feature_value(&self, feature_id: &str) -> Result<()> {
        self.set_feature_value(feature_id, FeatureValue::Unknown)
    }

    /// Reads several values with one query, in the order requested.
    fn get_feature_values(&self, feature_ids: &[&str]) -> Result<Vec<FeatureValue>> {
        self.store()
            .read_features(self.schema_id(), self.rid(), feature_ids)
    }

    /// Writes several values with one delete and one insert statement.
    fn set_feature_values(&self, feature_ids: &[&str], values: Vec<FeatureValue>) -> Result<()> {
        self.store().write_features(
            self.owner(),
            self.schema_id(),
            self.rid(),
            feature_ids,
            values,
        )
    }

    /// Every feature of the schema with its current value, in declaration order.
    fn feature_values(&self) -> Result<Vec<(String, FeatureValue)>> {
        self.store().read_all_features(self.schema_id(), self.rid())
    }
}

/// Any item of a store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Item<'g> {
    /// A node.
    Node(Node<'g>),
    /// A directed edge.
    DirectedEdge(DirectedEdge<'g>),
    /// An undirected edge.
    UndirectedEdge(UndirectedEdge<'g>),
    /// The singleton graph item.
    Graph(GraphItem<'g>),
}

impl<'g> Item<'g> {
    /// Item kind.
    pub fn kind(&self) -> SchemaKind {
        match self {
            Item::Node(_) => SchemaKind::Node,
            Item::DirectedEdge(_) => SchemaKind::DirectedEdge,
            Item::UndirectedEdge(_) => SchemaKind::UndirectedEdge,
            Item::Graph(_) => SchemaKind::Graph,
        }
    }

    /// The node, if this is one.
    pub fn as_node(&self) -> Option<&Node<'g>> {
        match self {
            Item::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The edge, if this is one.
    pub fn as_edge(&self) -> Option<Edge<'g>> {
        match self {
            Item::DirectedEdge(edge) => Some(Edge::Directed(edge.clone())),
            Item::UndirectedEdge(edge) => Some(Edge::Undirected(edge.clone())),
            Item::Node(_) | Item::Graph(_) => None,
        }
    }
}

impl<'g> From<Node<'g>> for Item<'g> {
    fn from(node: Node<'g>) -> Self {
        Item::Node(node)
    }
}

impl<'g> From<Edge<'g>> for Item<'g> {
    fn from(edge: Edge<'g>) -> Self {
        match edge {
            Edge::Directed(edge) => Item::DirectedEdge(edge),
            Edge::Undirected(edge) => Item::UndirectedEdge(edge),
        }
    }
}

impl<'g> HasFeatures<'g> for Item<'g> {
    fn store(&self) -> &'g GraphStore {
        match self {
            Item::Node(item) => item.store(),
            Item::DirectedEdge(item) => item.store(),
            Item::UndirectedEdge(item) => item.store(),
            Item::Graph(item) => item.store(),
        }
    }

    fn schema_id(&self) -> &str {
        match self {
            Item::Node(item) => HasFeatures::schema_id(item),
            Item::DirectedEdge(item) => HasFeatures::schema_id(item),
            Item::UndirectedEdge(item) => HasFeatures::schema_id(item),
            Item::Graph(item) => HasFeatures::schema_id(item),
        }
    }

    fn rid(&self) -> Rid {
        match self {
            Item::Node(item) => HasFeatures::rid(item),
            Item::DirectedEdge(item) => HasFeatures::rid(item),
            Item::UndirectedEdge(item) => HasFeatures::rid(item),
            Item::Graph(item) => HasFeatures::rid(item),
        }
    }

    fn owner(&self) -> FeatureOwner {
        match self {
            Item::Node(item) => item.owner(),
            Item::DirectedEdge(item) => item.owner(),
            Item::UndirectedEdge(item) => item.owner(),
            Item::Graph(item) => item.owner(),
        }
    }
}

impl<'g> FromRow<'g> for Item<'g> {
    fn from_row(store: &'g GraphStore, row: ItemRow) -> Result<Self> {
        match row.table {
            ItemTable::Nodes => Node::from_row(store, row).map(Item::Node),
            ItemTable::Edges => Edge::from_row(store, row).map(Item::from),
        }
    }
}

pub(crate) fn expect_table(row: &ItemRow, table: ItemTable) -> Result<()> {
    if row.table != table {
        return Err(GraphError::TypeMismatch(format!(
            "row {} of {:?} cannot be read as an item of {:?}",
            row.rid, row.table, table
        )));
    }
    Ok(())
}
