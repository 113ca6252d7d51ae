use crate::error::Result;
use crate::types::{ItemId, Rid, Role};

use super::super::cursor::{FromRow, ItemCursor, ItemRow};
use super::super::events::FeatureOwner;
use super::super::query::{ItemQuery, ItemTable};
use super::super::GraphStore;
use super::{expect_table, Edge, HasFeatures, ItemHandle};

/// Handle to a node of a store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Node<'g>(ItemHandle<'g>);

impl<'g> Node<'g> {
    pub(crate) fn from_handle(handle: ItemHandle<'g>) -> Self {
        Self(handle)
    }

    pub(crate) fn handle(&self) -> &ItemHandle<'g> {
        &self.0
    }

    /// External identifier.
    pub fn id(&self) -> ItemId {
        self.0.id()
    }

    /// Schema the node belongs to.
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

    fn cursor<T: FromRow<'g>>(&self, query: ItemQuery) -> ItemCursor<'g, T> {
        self.0.store.cursor(query)
    }

    fn adjacent(
        &self,
        own: Option<Role>,
        other: Option<Role>,
        edge_schema: Option<&str>,
    ) -> ItemCursor<'g, Node<'g>> {
        self.cursor(ItemQuery::nodes_adjacent_to_node(
            self.0.rid,
            own,
            other,
            edge_schema,
        ))
    }

    /// Nodes sharing at least one edge with this node.
    pub fn adjacent_nodes(&self) -> ItemCursor<'g, Node<'g>> {
        self.adjacent(None, None, None)
    }

    /// Nodes sharing an edge of schema `edge_schema` with this node.
    pub fn adjacent_nodes_of(&self, edge_schema: &str) -> ItemCursor<'g, Node<'g>> {
        self.adjacent(None, None, Some(edge_schema))
    }

    /// Sources of the directed edges this node is a target of.
    pub fn adjacent_sources(&self) -> ItemCursor<'g, Node<'g>> {
        self.adjacent(Some(Role::Target), Some(Role::Source), None)
    }

    /// [`adjacent_sources`](Self::adjacent_sources) through edges of one schema.
    pub fn adjacent_sources_of(&self, edge_schema: &str) -> ItemCursor<'g, Node<'g>> {
        self.adjacent(Some(Role::Target), Some(Role::Source), Some(edge_schema))
    }

    /// Targets of the directed edges this node is a source of.
    pub fn adjacent_targets(&self) -> ItemCursor<'g, Node<'g>> {
        self.adjacent(Some(Role::Source), Some(Role::Target), None)
    }

    /// [`adjacent_targets`](Self::adjacent_targets) through edges of one schema.
    pub fn adjacent_targets_of(&self, edge_schema: &str) -> ItemCursor<'g, Node<'g>> {
        self.adjacent(Some(Role::Source), Some(Role::Target), Some(edge_schema))
    }

    /// The other endpoints of `edge`; empty if this node is not incident to it.
    pub fn adjacent_nodes_via(&self, edge: &Edge<'_>) -> ItemCursor<'g, Node<'g>> {
        let query = ItemQuery::nodes_adjacent_via(self.0.rid, edge.rid());
        if self.0.store.same_store(edge.store()) {
            self.cursor(query)
        } else {
            self.cursor(query.nothing())
        }
    }

    /// Every edge this node is incident to.
    pub fn incident_edges(&self) -> ItemCursor<'g, Edge<'g>> {
        self.cursor(ItemQuery::edges_of_node(self.0.rid, None))
    }

    /// Incident edges of schema `edge_schema`.
    pub fn incident_edges_of(&self, edge_schema: &str) -> ItemCursor<'g, Edge<'g>> {
        self.cursor(ItemQuery::edges_of_node(self.0.rid, None).schema(edge_schema))
    }

    /// Directed edges this node is a source of.
    pub fn edges_where_source(&self) -> ItemCursor<'g, Edge<'g>> {
        self.cursor(ItemQuery::edges_of_node(self.0.rid, Some(Role::Source)))
    }

    /// [`edges_where_source`](Self::edges_where_source) restricted to one schema.
    pub fn edges_where_source_of(&self, edge_schema: &str) -> ItemCursor<'g, Edge<'g>> {
        self.cursor(ItemQuery::edges_of_node(self.0.rid, Some(Role::Source)).schema(edge_schema))
    }

    /// Directed edges this node is a target of.
    pub fn edges_where_target(&self) -> ItemCursor<'g, Edge<'g>> {
        self.cursor(ItemQuery::edges_of_node(self.0.rid, Some(Role::Target)))
    }

    /// [`edges_where_target`](Self::edges_where_target) restricted to one schema.
    pub fn edges_where_target_of(&self, edge_schema: &str) -> ItemCursor<'g, Edge<'g>> {
        self.cursor(ItemQuery::edges_of_node(self.0.rid, Some(Role::Target)).schema(edge_schema))
    }

    /// Number of distinct edges incident to this node.
    pub fn degree(&self) -> Result<usize> {
        self.0
            .store
            .count(&ItemQuery::edges_of_node(self.0.rid, None))
    }

    /// Whether `other` shares an edge with this node.
    pub fn is_adjacent(&self, other: &Node<'_>) -> Result<bool> {
        if !self.0.store.same_store(other.0.store) {
            return Ok(false);
        }
        let query = ItemQuery::nodes_adjacent_to_node(self.0.rid, None, None, None);
        self.0.store.contains(&query, other.rid())
    }

    /// Whether this node is an endpoint of `edge`.
    pub fn is_incident(&self, edge: &Edge<'_>) -> Result<bool> {
        if !self.0.store.same_store(edge.store()) {
            return Ok(false);
        }
        let query = ItemQuery::edges_of_node(self.0.rid, None);
        self.0.store.contains(&query, edge.rid())
    }

    /// Detaches this node from every incident edge.
    ///
    /// An edge that would be left without a required endpoint is removed
    /// instead.
    pub fn remove_incident_edges(&self) -> Result<()> {
        self.0.store.remove_incident_edges_of(self)
    }
}

impl<'g> HasFeatures<'g> for Node<'g> {
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
        FeatureOwner::Item(self.id())
    }
}

impl<'g> FromRow<'g> for Node<'g> {
    fn from_row(store: &'g GraphStore, row: ItemRow) -> Result<Self> {
        expect_table(&row, ItemTable::Nodes)?;
        Ok(Node(ItemHandle::new(
            store,
            row.schema_id,
            row.object_id,
            row.rid,
        )))
    }
}
