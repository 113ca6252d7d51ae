use rustc_hash::FxHashSet;
use tracing::debug;

use super::{count_to_usize, GraphStore};
use crate::error::{GraphError, Result};
use crate::storage::cursor::ItemCursor;
use crate::storage::ddl::{self, EDGE_KIND_DIRECTED, EDGE_KIND_UNDIRECTED};
use crate::storage::events::GraphEvent;
use crate::storage::item::{DirectedEdge, Edge, Item, ItemHandle, Node, UndirectedEdge};
use crate::storage::query::ItemQuery;
use crate::types::{ItemId, Rid, Role, SchemaKind};

impl GraphStore {
    /// Adds a directed edge from `sources` to `targets`.
    ///
    /// Both lists must be non-empty and every node must belong to this store.
    /// Nothing is written unless all checks pass.
    pub fn add_directed_edge(
        &self,
        id: &ItemId,
        sources: &[Node<'_>],
        targets: &[Node<'_>],
    ) -> Result<DirectedEdge<'_>> {
        let rid = self.insert_edge(
            id,
            SchemaKind::DirectedEdge,
            &[(Role::Source, sources), (Role::Target, targets)],
        )?;
        Ok(DirectedEdge::from_handle(self.handle(id, rid)))
    }

    /// Adds an undirected edge between `nodes`, which must be non-empty.
    pub fn add_undirected_edge(
        &self,
        id: &ItemId,
        nodes: &[Node<'_>],
    ) -> Result<UndirectedEdge<'_>> {
        let rid = self.insert_edge(
            id,
            SchemaKind::UndirectedEdge,
            &[(Role::Undirected, nodes)],
        )?;
        Ok(UndirectedEdge::from_handle(self.handle(id, rid)))
    }

    /// Handle to the edge `id`, if it exists in this store.
    pub fn get_edge(&self, id: &ItemId) -> Result<Option<Edge<'_>>> {
        if id.graph() != self.graph_id() {
            return Ok(None);
        }
        let found = self.backing()?.query_row(
            ddl::SELECT_EDGE_RID,
            (id.schema_id(), id.object_id()),
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        match found {
            Some((rid, kind)) => Edge::from_kind(self.handle(id, Rid(rid)), kind).map(Some),
            None => Ok(None),
        }
    }

    /// Whether the edge `id` exists in this store.
    pub fn has_edge(&self, id: &ItemId) -> Result<bool> {
        Ok(self.get_edge(id)?.is_some())
    }

    /// The node or edge `id`, if it exists in this store.
    pub fn get_item(&self, id: &ItemId) -> Result<Option<Item<'_>>> {
        if let Some(node) = self.get_node(id)? {
            return Ok(Some(Item::Node(node)));
        }
        Ok(self.get_edge(id)?.map(Item::from))
    }

    /// All edges, in insertion order.
    pub fn get_edges(&self) -> ItemCursor<'_, Edge<'_>> {
        self.cursor(ItemQuery::edges())
    }

    /// Edges of one schema, in insertion order.
    pub fn get_edges_of(&self, schema_id: &str) -> ItemCursor<'_, Edge<'_>> {
        self.cursor(ItemQuery::edges().schema(schema_id))
    }

    /// Number of edges.
    pub fn num_edges(&self) -> Result<usize> {
        Ok(count_to_usize(self.scalar(ddl::COUNT_EDGES, [])?))
    }

    /// Number of edges of one schema.
    pub fn num_edges_of(&self, schema_id: &str) -> Result<usize> {
        self.count(&ItemQuery::edges().schema(schema_id))
    }

    /// Every node or edge of `schema_id`, in insertion order.
    ///
    /// Graph schemas have no items to enumerate; use [`graph`](Self::graph).
    pub fn get_graph_items(&self, schema_id: &str) -> Result<ItemCursor<'_, Item<'_>>> {
        let query = match self.schema_kind(schema_id)? {
            SchemaKind::Node => ItemQuery::nodes(),
            SchemaKind::DirectedEdge | SchemaKind::UndirectedEdge => ItemQuery::edges(),
            SchemaKind::Graph => {
                return Err(GraphError::TypeMismatch(format!(
                    "{schema_id} is a graph schema"
                )))
            }
        };
        Ok(self.cursor(query.schema(schema_id)))
    }

    /// Removes the edge `id` with its incidences and feature values.
    pub fn remove_edge(&self, id: &ItemId) -> Result<()> {
        self.check_graph(id)?;
        let edge = self
            .get_edge(id)?
            .ok_or_else(|| GraphError::InvalidState(format!("edge {id} does not exist")))?;
        let backing = self.backing()?;
        backing.savepoint("remove_edge", || {
            self.remove_edge_rows(edge.rid(), id.schema_id())
        })?;
        debug!(edge = %id, "edge removed");
        self.fire(GraphEvent::EdgeRemoved(id.clone()))
    }

    /// Deletes the attribute rows, incidences and base row of one edge.
    ///
    /// Incidences are deleted explicitly so that removal does not depend on
    /// foreign key cascades being enabled.
    pub(crate) fn remove_edge_rows(&self, rid: Rid, schema_id: &str) -> Result<()> {
        let backing = self.backing()?;
        if self.schemas.borrow().contains_key(schema_id) {
            backing.execute(&ddl::delete_item_features(schema_id), [rid.0])?;
        }
        backing.execute(ddl::DELETE_EDGE_INCIDENCE, [rid.0])?;
        backing.execute(ddl::DELETE_EDGE, [rid.0])?;
        self.metrics.edge_removed();
        Ok(())
    }

    /// Adds `node` to `edge` in `role`.
    pub(crate) fn attach(&self, edge: &ItemHandle<'_>, node: &Node<'_>, role: Role) -> Result<()> {
        self.check_endpoint(node)?;
        self.check_edge_present(edge)?;
        let backing = self.backing()?;
        if self.has_incidence(edge.rid, role, node.rid())? {
            return Err(GraphError::DuplicateIncidence(format!(
                "{} is already a {} of {}",
                node.id(),
                role.as_str(),
                edge.id()
            )));
        }
        backing.execute(ddl::INSERT_INCIDENCE, (edge.rid.0, role.code(), node.rid().0))?;
        debug!(edge = %edge.id(), node = %node.id(), role = role.as_str(), "endpoint added");
        Ok(())
    }

    /// Removes `node` from `edge` in `role`; the last occupant of a role stays.
    pub(crate) fn detach(&self, edge: &ItemHandle<'_>, node: &Node<'_>, role: Role) -> Result<()> {
        self.check_endpoint(node)?;
        self.check_edge_present(edge)?;
        let backing = self.backing()?;
        if !self.has_incidence(edge.rid, role, node.rid())? {
            return Err(GraphError::InvalidState(format!(
                "{} is not a {} of {}",
                node.id(),
                role.as_str(),
                edge.id()
            )));
        }
        let occupants = self.scalar(ddl::COUNT_ROLE, (edge.rid.0, role.code()))?;
        if occupants <= 1 {
            return Err(GraphError::InvalidState(format!(
                "removing {} would leave {} without a {}",
                node.id(),
                edge.id(),
                role.as_str()
            )));
        }
        backing.execute(ddl::DELETE_INCIDENCE, (edge.rid.0, role.code(), node.rid().0))?;
        debug!(edge = %edge.id(), node = %node.id(), role = role.as_str(), "endpoint removed");
        Ok(())
    }

    fn insert_edge(
        &self,
        id: &ItemId,
        kind: SchemaKind,
        endpoints: &[(Role, &[Node<'_>])],
    ) -> Result<Rid> {
        self.check_item_kind(id, kind)?;
        self.check_graph(id)?;
        if self.has_edge(id)? {
            return Err(GraphError::InvalidState(format!("edge {id} already exists")));
        }
        for (role, nodes) in endpoints {
            if nodes.is_empty() {
                return Err(GraphError::InvalidState(format!(
                    "edge {id} needs at least one {}",
                    role.as_str()
                )));
            }
            let mut seen = FxHashSet::default();
            for node in nodes.iter() {
                self.check_endpoint(node)?;
                if !seen.insert(node.rid()) {
                    return Err(GraphError::DuplicateIncidence(format!(
                        "{} is listed twice as a {} of {id}",
                        node.id(),
                        role.as_str()
                    )));
                }
            }
        }

        let edge_kind = match kind {
            SchemaKind::DirectedEdge => EDGE_KIND_DIRECTED,
            _ => EDGE_KIND_UNDIRECTED,
        };
        let rid = self.next_edge_rid();
        let backing = self.backing()?;
        backing.savepoint("add_edge", || {
            backing.execute(
                ddl::INSERT_EDGE,
                (rid.0, id.schema_id(), id.object_id(), edge_kind),
            )?;
            for (role, nodes) in endpoints {
                for node in nodes.iter() {
                    backing.execute(ddl::INSERT_INCIDENCE, (rid.0, role.code(), node.rid().0))?;
                }
            }
            Ok(())
        })?;
        self.metrics.edge_created();
        debug!(edge = %id, rid = rid.0, kind = %kind, "edge added");
        self.fire(GraphEvent::EdgeAdded(id.clone()))?;
        Ok(rid)
    }

    /// Fails with `NotInGraph` unless `node` is a live node of this store.
    fn check_endpoint(&self, node: &Node<'_>) -> Result<()> {
        let member = self.same_store(node.handle().store)
            && self.node_rid(&node.id())? == Some(node.rid());
        if !member {
            return Err(GraphError::NotInGraph(node.id().to_string()));
        }
        Ok(())
    }

    fn check_edge_present(&self, edge: &ItemHandle<'_>) -> Result<()> {
        let present = self.same_store(edge.store)
            && self.contains(&ItemQuery::edges(), edge.rid)?;
        if !present {
            return Err(GraphError::InvalidState(format!(
                "edge {} does not exist",
                edge.id()
            )));
        }
        Ok(())
    }

    fn has_incidence(&self, edge: Rid, role: Role, node: Rid) -> Result<bool> {
        Ok(self
            .backing()?
            .query_row(ddl::SELECT_INCIDENCE, (edge.0, role.code(), node.0), |row| {
                row.get(0)
            })?
            .unwrap_or(false))
    }
}
