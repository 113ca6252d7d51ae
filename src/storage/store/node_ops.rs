use tracing::debug;

use super::{count_to_usize, GraphStore};
use crate::error::{GraphError, Result};
use crate::storage::cursor::ItemCursor;
use crate::storage::ddl;
use crate::storage::events::GraphEvent;
use crate::storage::item::{ItemHandle, Node};
use crate::storage::query::ItemQuery;
use crate::types::{ItemId, Rid, SchemaKind, ROLE_UNDIRECTED};

/// An incidence of a node being detached, with the edge's occupancy of that role.
struct Incidence {
    edge: Rid,
    role: i64,
    edge_id: (String, String),
    role_count: i64,
}

impl GraphStore {
    /// Adds a node.
    ///
    /// Fails with `UndefinedSchema`, `TypeMismatch` or `WrongGraph` when the
    /// identifier does not name a node schema of this store, and with
    /// `InvalidState` when the node already exists.
    pub fn add_node(&self, id: &ItemId) -> Result<Node<'_>> {
        self.check_item_kind(id, SchemaKind::Node)?;
        self.check_graph(id)?;
        if self.node_rid(id)?.is_some() {
            return Err(GraphError::InvalidState(format!("node {id} already exists")));
        }
        let rid = self.next_node_rid();
        self.backing()?
            .execute(ddl::INSERT_NODE, (rid.0, id.schema_id(), id.object_id()))?;
        self.metrics.node_created();
        debug!(node = %id, rid = rid.0, "node added");
        let node = Node::from_handle(self.handle(id, rid));
        self.fire(GraphEvent::NodeAdded(id.clone()))?;
        Ok(node)
    }

    /// Handle to the node `id`, if it exists in this store.
    pub fn get_node(&self, id: &ItemId) -> Result<Option<Node<'_>>> {
        if id.graph() != self.graph_id() {
            return Ok(None);
        }
        Ok(self
            .node_rid(id)?
            .map(|rid| Node::from_handle(self.handle(id, rid))))
    }

    /// Whether the node `id` exists in this store.
    pub fn has_node(&self, id: &ItemId) -> Result<bool> {
        Ok(self.get_node(id)?.is_some())
    }

    /// All nodes, in insertion order.
    pub fn get_nodes(&self) -> ItemCursor<'_, Node<'_>> {
        self.cursor(ItemQuery::nodes())
    }

    /// Nodes of one schema, in insertion order.
    pub fn get_nodes_of(&self, schema_id: &str) -> ItemCursor<'_, Node<'_>> {
        self.cursor(ItemQuery::nodes().schema(schema_id))
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> Result<usize> {
        Ok(count_to_usize(self.scalar(ddl::COUNT_NODES, [])?))
    }

    /// Number of nodes of one schema.
    pub fn num_nodes_of(&self, schema_id: &str) -> Result<usize> {
        self.count(&ItemQuery::nodes().schema(schema_id))
    }

    /// Removes the node `id`.
    ///
    /// The node is detached from every incident edge first. A directed edge
    /// left without a source or a target, and an undirected edge left
    /// connecting fewer than two nodes, is removed with it; each such
    /// `EdgeRemoved` event precedes the `NodeRemoved` one.
    pub fn remove_node(&self, id: &ItemId) -> Result<()> {
        self.check_graph(id)?;
        let node = self
            .get_node(id)?
            .ok_or_else(|| GraphError::InvalidState(format!("node {id} does not exist")))?;
        let rid = node.rid();
        let backing = self.backing()?;
        let removed = backing.savepoint("remove_node", || {
            let removed = self.detach_node(rid)?;
            if self.schemas.borrow().contains_key(id.schema_id()) {
                backing.execute(&ddl::delete_item_features(id.schema_id()), [rid.0])?;
            }
            backing.execute(ddl::DELETE_NODE, [rid.0])?;
            Ok(removed)
        })?;
        self.metrics.node_removed();
        debug!(node = %id, cascaded = removed.len(), "node removed");
        self.fire_all(removed.into_iter().map(GraphEvent::EdgeRemoved))?;
        self.fire(GraphEvent::NodeRemoved(id.clone()))
    }

    /// Detaches `node` from every incident edge, removing edges that would be
    /// left without a required endpoint.
    pub(crate) fn remove_incident_edges_of(&self, node: &Node<'_>) -> Result<()> {
        if !self.same_store(node.handle().store) {
            return Err(GraphError::NotInGraph(node.id().to_string()));
        }
        let backing = self.backing()?;
        let removed =
            backing.savepoint("remove_incident_edges", || self.detach_node(node.rid()))?;
        debug!(node = %node.id(), removed = removed.len(), "incident edges removed");
        self.fire_all(removed.into_iter().map(GraphEvent::EdgeRemoved))
    }

    /// Deletes every incidence of `node`, and every edge it leaves invalid: a
    /// directed edge without a source or a target, or an undirected edge
    /// connecting fewer than two nodes. Returns the ids of the removed edges.
    fn detach_node(&self, node: Rid) -> Result<Vec<ItemId>> {
        let backing = self.backing()?;
        let incidences = backing.query(ddl::NODE_INCIDENCES, [node.0], |row| {
            Ok(Incidence {
                edge: Rid(row.get(0)?),
                role: row.get(1)?,
                edge_id: (row.get(2)?, row.get(3)?),
                role_count: row.get(4)?,
            })
        })?;
        let mut doomed: Vec<&Incidence> = Vec::new();
        for incidence in &incidences {
            let already = doomed.last().is_some_and(|last| last.edge == incidence.edge);
            let minimum = if incidence.role == ROLE_UNDIRECTED { 2 } else { 1 };
            if incidence.role_count <= minimum && !already {
                doomed.push(incidence);
            }
        }
        backing.execute(ddl::DELETE_NODE_INCIDENCE, [node.0])?;
        let mut removed = Vec::with_capacity(doomed.len());
        for incidence in doomed {
            let (schema_id, object_id) = &incidence.edge_id;
            self.remove_edge_rows(incidence.edge, schema_id)?;
            debug!(
                edge = %incidence.edge,
                role = incidence.role,
                "edge lost its last endpoint in a role"
            );
            removed.push(ItemId::from_parts(
                self.graph_id.clone(),
                schema_id.clone(),
                object_id.clone(),
            ));
        }
        Ok(removed)
    }

    pub(crate) fn node_rid(&self, id: &ItemId) -> Result<Option<Rid>> {
        self.backing()?.query_row(
            ddl::SELECT_NODE_RID,
            (id.schema_id(), id.object_id()),
            |row| row.get::<_, i64>(0).map(Rid),
        )
    }

    pub(crate) fn handle(&self, id: &ItemId, rid: Rid) -> ItemHandle<'_> {
        ItemHandle::new(
            self,
            id.schema_id().to_owned(),
            id.object_id().to_owned(),
            rid,
        )
    }

    /// Checks that the schema of `id` is registered with kind `kind`.
    pub(crate) fn check_item_kind(&self, id: &ItemId, kind: SchemaKind) -> Result<()> {
        let actual = self.schema_kind(id.schema_id())?;
        if actual != kind {
            return Err(GraphError::TypeMismatch(format!(
                "{id} names a {actual} schema, expected {kind}"
            )));
        }
        Ok(())
    }
}
