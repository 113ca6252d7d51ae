use tracing::debug;

use super::{count_to_usize, GraphStore};
use crate::error::Result;
use crate::storage::ddl;
use crate::storage::events::GraphEvent;
use crate::types::{ItemId, Rid, SchemaKind};

/// Items removed by one bulk operation.
#[derive(Default)]
struct Removed {
    edges: Vec<ItemId>,
    nodes: Vec<ItemId>,
    num_edges: usize,
    num_nodes: usize,
}

impl GraphStore {
    /// Removes every edge.
    ///
    /// Tables are cleared in dependency order (incidences, attribute rows,
    /// base rows), so the result does not depend on foreign key cascades.
    pub fn remove_all_edges(&self) -> Result<()> {
        let backing = self.backing()?;
        let removed = backing.savepoint("remove_all_edges", || {
            let removed = Removed {
                edges: self.listed_items(ddl::SELECT_EDGE_IDS, None)?,
                num_edges: count_to_usize(self.scalar(ddl::COUNT_EDGES, [])?),
                ..Removed::default()
            };
            backing.execute(ddl::DELETE_ALL_INCIDENCE, [])?;
            self.clear_attribute_tables(SchemaKind::is_edge)?;
            backing.execute(ddl::DELETE_ALL_EDGES, [])?;
            Ok(removed)
        })?;
        debug!(edges = removed.num_edges, "all edges removed");
        self.finish_removal(removed)
    }

    /// Removes every node, and with them every edge.
    pub fn remove_all_nodes(&self) -> Result<()> {
        let backing = self.backing()?;
        let removed = backing.savepoint("remove_all_nodes", || {
            let removed = Removed {
                edges: self.listed_items(ddl::SELECT_EDGE_IDS, None)?,
                nodes: self.listed_items(ddl::SELECT_NODE_IDS, None)?,
                num_edges: count_to_usize(self.scalar(ddl::COUNT_EDGES, [])?),
                num_nodes: count_to_usize(self.scalar(ddl::COUNT_NODES, [])?),
            };
            backing.execute(ddl::DELETE_ALL_INCIDENCE, [])?;
            self.clear_attribute_tables(SchemaKind::is_edge)?;
            backing.execute(ddl::DELETE_ALL_EDGES, [])?;
            self.clear_attribute_tables(|kind| kind == SchemaKind::Node)?;
            backing.execute(ddl::DELETE_ALL_NODES, [])?;
            Ok(removed)
        })?;
        debug!(
            nodes = removed.num_nodes,
            edges = removed.num_edges,
            "all nodes removed"
        );
        self.finish_removal(removed)
    }

    /// Removes every item of `schema_id`.
    ///
    /// Removing the nodes of a schema also removes each edge that would be
    /// left without a required endpoint, as [`remove_node`](Self::remove_node)
    /// does. For a graph schema, the graph item's stored values
    /// are cleared.
    pub fn remove_all_graph_items(&self, schema_id: &str) -> Result<()> {
        let kind = self.schema_kind(schema_id)?;
        let backing = self.backing()?;
        let table = ddl::clear_attribute_table(schema_id);
        let removed = backing.savepoint("remove_all_graph_items", || {
            let mut removed = Removed::default();
            match kind {
                SchemaKind::Node => {
                    removed.nodes =
                        self.listed_items(ddl::SELECT_SCHEMA_NODE_IDS, Some(schema_id))?;
                    removed.num_nodes = self.num_nodes_of(schema_id)?;
                    for (rid, id) in self.doomed_edges(schema_id)? {
                        self.remove_edge_rows(rid, id.schema_id())?;
                        removed.edges.push(id);
                    }
                    backing.execute(ddl::DELETE_SCHEMA_NODE_INCIDENCE, [schema_id])?;
                    backing.execute(&table, [])?;
                    backing.execute(ddl::DELETE_SCHEMA_NODES, [schema_id])?;
                }
                SchemaKind::DirectedEdge | SchemaKind::UndirectedEdge => {
                    removed.edges =
                        self.listed_items(ddl::SELECT_SCHEMA_EDGE_IDS, Some(schema_id))?;
                    removed.num_edges = self.num_edges_of(schema_id)?;
                    backing.execute(ddl::DELETE_SCHEMA_EDGE_INCIDENCE, [schema_id])?;
                    backing.execute(&table, [])?;
                    backing.execute(ddl::DELETE_SCHEMA_EDGES, [schema_id])?;
                }
                SchemaKind::Graph => {
                    backing.execute(&table, [])?;
                }
            }
            Ok(removed)
        })?;
        debug!(
            schema = schema_id,
            nodes = removed.num_nodes,
            edges = removed.num_edges.max(removed.edges.len()),
            "schema items removed"
        );
        self.finish_removal(removed)
    }

    /// Edges the removal of every node of `schema_id` would leave invalid.
    fn doomed_edges(&self, schema_id: &str) -> Result<Vec<(Rid, ItemId)>> {
        let graph = self.graph_id();
        self.backing()?.query(ddl::SCHEMA_DOOMED_EDGES, [schema_id], |row| {
            Ok((
                Rid(row.get(0)?),
                ItemId::from_parts(graph.clone(), row.get(1)?, row.get(2)?),
            ))
        })
    }

    /// Ids listed by `sql`, materialized only when a listener will see them.
    fn listed_items(&self, sql: &str, schema_id: Option<&str>) -> Result<Vec<ItemId>> {
        if !self.has_listeners() {
            return Ok(Vec::new());
        }
        let graph = self.graph_id();
        let map = |row: &rusqlite::Row<'_>| {
            Ok(ItemId::from_parts(graph.clone(), row.get(1)?, row.get(2)?))
        };
        let backing = self.backing()?;
        match schema_id {
            Some(schema_id) => backing.query(sql, [schema_id], map),
            None => backing.query(sql, [], map),
        }
    }

    fn clear_attribute_tables(&self, kinds: impl Fn(SchemaKind) -> bool) -> Result<()> {
        let backing = self.backing()?;
        let tables: Vec<String> = self
            .schemas
            .borrow()
            .iter()
            .filter(|(_, schema)| kinds(schema.kind()))
            .map(|(id, _)| ddl::clear_attribute_table(id))
            .collect();
        for sql in tables {
            backing.execute(&sql, [])?;
        }
        Ok(())
    }

    /// Records metrics and announces removals, edges first.
    fn finish_removal(&self, removed: Removed) -> Result<()> {
        // Dangling edges were counted by remove_edge_rows.
        for _ in 0..removed.num_edges {
            self.metrics.edge_removed();
        }
        for _ in 0..removed.num_nodes {
            self.metrics.node_removed();
        }
        self.fire_all(removed.edges.into_iter().map(GraphEvent::EdgeRemoved))?;
        self.fire_all(removed.nodes.into_iter().map(GraphEvent::NodeRemoved))
    }
}
