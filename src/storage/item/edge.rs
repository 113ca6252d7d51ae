use crate::error::{GraphError, Result};
use crate::types::{ItemId, Rid, Role};

use super::super::cursor::{FromRow, ItemCursor, ItemRow};
use super::super::ddl::{EDGE_KIND_DIRECTED, EDGE_KIND_UNDIRECTED};
use super::super::events::FeatureOwner;
use super::super::query::{ItemQuery, ItemTable};
use super::super::GraphStore;
use super::{expect_table, HasFeatures, ItemHandle, Node};

/// Handle to a directed edge: incident nodes are split into sources and targets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DirectedEdge<'g>(ItemHandle<'g>);

/// Handle to an undirected edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UndirectedEdge<'g>(ItemHandle<'g>);

/// Either kind of edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Edge<'g> {
    /// A directed edge.
    Directed(DirectedEdge<'g>),
    /// An undirected edge.
    Undirected(UndirectedEdge<'g>),
}

impl<'g> DirectedEdge<'g> {
    pub(crate) fn from_handle(handle: ItemHandle<'g>) -> Self {
        Self(handle)
    }

    /// External identifier.
    pub fn id(&self) -> ItemId {
        self.0.id()
    }

    /// Schema the edge belongs to.
    pub fn schema_id(&self) -> &str {
        &self.0.schema_id
    }

    /// Object id, unique within the schema.
    pub fn object_id(&self) -> &str {
        &self.0.object_id
    }

    /// Store-local row id.
    pub fn rid(&self) -> Rid {
        self.0.rid
    }

    /// Adds `node` as a source. Fails with `DuplicateIncidence` if it already is one.
    pub fn add_source_node(&self, node: &Node<'_>) -> Result<()> {
        self.0.store.attach(&self.0, node, Role::Source)
    }

    /// Adds `node` as a target. Fails with `DuplicateIncidence` if it already is one.
    pub fn add_target_node(&self, node: &Node<'_>) -> Result<()> {
        self.0.store.attach(&self.0, node, Role::Target)
    }

    /// Removes `node` from the sources; the last source cannot be removed.
    pub fn remove_source_node(&self, node: &Node<'_>) -> Result<()> {
        self.0.store.detach(&self.0, node, Role::Source)
    }

    /// Removes `node` from the targets; the last target cannot be removed.
    pub fn remove_target_node(&self, node: &Node<'_>) -> Result<()> {
        self.0.store.detach(&self.0, node, Role::Target)
    }

    /// Source nodes.
    pub fn source_nodes(&self) -> ItemCursor<'g, Node<'g>> {
        self.0
            .store
            .cursor(ItemQuery::nodes_of_edge(self.0.rid, Some(Role::Source)))
    }

    /// Target nodes.
    pub fn target_nodes(&self) -> ItemCursor<'g, Node<'g>> {
        self.0
            .store
            .cursor(ItemQuery::nodes_of_edge(self.0.rid, Some(Role::Target)))
    }

    /// Number of sources.
    pub fn num_sources(&self) -> Result<usize> {
        self.0
            .store
            .count(&ItemQuery::nodes_of_edge(self.0.rid, Some(Role::Source)))
    }

    /// Number of targets.
    pub fn num_targets(&self) -> Result<usize> {
        self.0
            .store
            .count(&ItemQuery::nodes_of_edge(self.0.rid, Some(Role::Target)))
    }

    /// Erases the edge kind.
    pub fn as_edge(&self) -> Edge<'g> {
        Edge::Directed(self.clone())
    }
}

impl<'g> UndirectedEdge<'g> {
    pub(crate) fn from_handle(handle: ItemHandle<'g>) -> Self {
        Self(handle)
    }

    /// External identifier.
    pub fn id(&self) -> ItemId {
        self.0.id()
    }

    /// Schema the edge belongs to.
    pub fn schema_id(&self) -> &str {
        &self.0.schema_id
    }

    /// Object id, unique within the schema.
    pub fn object_id(&self) -> &str {
        &self.0.object_id
    }

    /// Store-local row id.
    pub fn rid(&self) -> Rid {
        self.0.rid
    }

    /// Adds an endpoint. Fails with `DuplicateIncidence` if already present.
    pub fn add_node(&self, node: &Node<'_>) -> Result<()> {
        self.0.store.attach(&self.0, node, Role::Undirected)
    }

    /// Removes an endpoint; the last one cannot be removed.
    pub fn remove_node(&self, node: &Node<'_>) -> Result<()> {
        self.0.store.detach(&self.0, node, Role::Undirected)
    }

    /// Endpoints.
    pub fn nodes(&self) -> ItemCursor<'g, Node<'g>> {
        self.0
            .store
            .cursor(ItemQuery::nodes_of_edge(self.0.rid, None))
    }

    /// Erases the edge kind.
    pub fn as_edge(&self) -> Edge<'g> {
        Edge::Undirected(self.clone())
    }
}

impl<'g> Edge<'g> {
    pub(crate) fn handle(&self) -> &ItemHandle<'g> {
        match self {
            Edge::Directed(edge) => &edge.0,
            Edge::Undirected(edge) => &edge.0,
        }
    }

    pub(crate) fn from_kind(handle: ItemHandle<'g>, kind: i64) -> Result<Self> {
        match kind {
            EDGE_KIND_DIRECTED => Ok(Edge::Directed(DirectedEdge(handle))),
            EDGE_KIND_UNDIRECTED => Ok(Edge::Undirected(UndirectedEdge(handle))),
            other => Err(GraphError::InvalidState(format!(
                "edge {}.{} has unknown kind {other}",
                handle.schema_id, handle.object_id
            ))),
        }
    }

    /// External identifier.
    pub fn id(&self) -> ItemId {
        self.handle().id()
    }

    /// Schema the edge belongs to.
    pub fn schema_id(&self) -> &str {
        &self.handle().schema_id
    }

    /// Object id, unique within the schema.
    pub fn object_id(&self) -> &str {
        &self.handle().object_id
    }

    /// Store-local row id.
    pub fn rid(&self) -> Rid {
        self.handle().rid
    }

    /// Whether this is a directed edge.
    pub fn is_directed(&self) -> bool {
        matches!(self, Edge::Directed(_))
    }

    /// The directed edge, if this is one.
    pub fn as_directed(&self) -> Option<&DirectedEdge<'g>> {
        match self {
            Edge::Directed(edge) => Some(edge),
            Edge::Undirected(_) => None,
        }
    }

    /// The undirected edge, if this is one.
    pub fn as_undirected(&self) -> Option<&UndirectedEdge<'g>> {
        match self {
            Edge::Undirected(edge) => Some(edge),
            Edge::Directed(_) => None,
        }
    }

    fn cursor<T: FromRow<'g>>(&self, query: ItemQuery) -> ItemCursor<'g, T> {
        self.handle().store.cursor(query)
    }

    /// Every endpoint, in either role.
    pub fn incident_nodes(&self) -> ItemCursor<'g, Node<'g>> {
        self.cursor(ItemQuery::nodes_of_edge(self.rid(), None))
    }

    /// Endpoints of schema `node_schema`.
    pub fn incident_nodes_of(&self, node_schema: &str) -> ItemCursor<'g, Node<'g>> {
        self.cursor(ItemQuery::nodes_of_edge(self.rid(), None).schema(node_schema))
    }

    /// Number of distinct endpoints.
    pub fn num_nodes(&self) -> Result<usize> {
        self.handle()
            .store
            .count(&ItemQuery::nodes_of_edge(self.rid(), None))
    }

    /// Other edges sharing at least one endpoint with this edge.
    pub fn adjacent_edges(&self) -> ItemCursor<'g, Edge<'g>> {
        self.cursor(ItemQuery::edges_adjacent_to_edge(self.rid(), None))
    }

    /// Adjacent edges of schema `edge_schema`.
    pub fn adjacent_edges_of(&self, edge_schema: &str) -> ItemCursor<'g, Edge<'g>> {
        self.cursor(ItemQuery::edges_adjacent_to_edge(self.rid(), None).schema(edge_schema))
    }

    /// Other edges incident to `node`; empty if `node` is not an endpoint of this edge.
    pub fn adjacent_edges_via(&self, node: &Node<'_>) -> ItemCursor<'g, Edge<'g>> {
        let query = ItemQuery::edges_adjacent_to_edge(self.rid(), Some(node.rid()));
        if self.handle().store.same_store(node.store()) {
            self.cursor(query)
        } else {
            self.cursor(query.nothing())
        }
    }

    /// Whether `node` is an endpoint of this edge.
    pub fn is_incident(&self, node: &Node<'_>) -> Result<bool> {
        node.is_incident(self)
    }

    /// Whether `other` shares an endpoint with this edge.
    pub fn is_adjacent(&self, other: &Edge<'_>) -> Result<bool> {
        let store = self.handle().store;
        if !store.same_store(other.handle().store) {
            return Ok(false);
        }
        let query = ItemQuery::edges_adjacent_to_edge(self.rid(), None);
        store.contains(&query, other.rid())
    }
}

impl<'g> From<DirectedEdge<'g>> for Edge<'g> {
    fn from(edge: DirectedEdge<'g>) -> Self {
        Edge::Directed(edge)
    }
}

impl<'g> From<UndirectedEdge<'g>> for Edge<'g> {
    fn from(edge: UndirectedEdge<'g>) -> Self {
        Edge::Undirected(edge)
    }
}

macro_rules! impl_edge_features {
    ($ty:ident) => {
        impl<'g> HasFeatures<'g> for $ty<'g> {
            fn store(&self) -> &'g GraphStore {
                self.0.store
            }

            fn schema_id(&self) -> &str {
                &self.0.schema_id
            }

            fn rid(&self) -> Rid {
                self.0.rid
            }

            fn owner(&self) -> FeatureOwner {
                FeatureOwner::Item(self.0.id())
            }
        }
    };
}

impl_edge_features!(DirectedEdge);
impl_edge_features!(UndirectedEdge);

impl<'g> HasFeatures<'g> for Edge<'g> {
    fn store(&self) -> &'g GraphStore {
        self.handle().store
    }

    fn schema_id(&self) -> &str {
        &self.handle().schema_id
    }

    fn rid(&self) -> Rid {
        self.handle().rid
    }

    fn owner(&self) -> FeatureOwner {
        FeatureOwner::Item(self.id())
    }
}

impl<'g> FromRow<'g> for Edge<'g> {
    fn from_row(store: &'g GraphStore, row: ItemRow) -> Result<Self> {
        expect_table(&row, ItemTable::Edges)?;
        let kind = row.edge_kind.ok_or_else(|| {
            GraphError::InvalidState(format!("edge row {} carries no kind", row.rid))
        })?;
        Edge::from_kind(
            ItemHandle::new(store, row.schema_id, row.object_id, row.rid),
            kind,
        )
    }
}
