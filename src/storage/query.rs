//! Parameterized navigation queries over `nodes`, `edges` and `edge_incidence`.
//!
//! Every query selects distinct rows of one base table (aliased `t`). Cursors
//! page through the result with a keyset on `t.rid`, so the same query can be
//! re-executed page after page without holding a statement open.

use rusqlite::types::Value;

use crate::types::{Rid, Role};

/// Base table a query yields rows from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ItemTable {
    Nodes,
    Edges,
}

impl ItemTable {
    fn name(self) -> &'static str {
        match self {
            ItemTable::Nodes => "nodes",
            ItemTable::Edges => "edges",
        }
    }

    fn kind_column(self) -> &'static str {
        match self {
            ItemTable::Nodes => "NULL",
            ItemTable::Edges => "t.kind",
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ItemQuery {
    table: ItemTable,
    joins: Vec<&'static str>,
    filters: Vec<&'static str>,
    params: Vec<Value>,
}

impl ItemQuery {
    pub(crate) fn nodes() -> Self {
        Self::scan(ItemTable::Nodes)
    }

    pub(crate) fn edges() -> Self {
        Self::scan(ItemTable::Edges)
    }

    fn scan(table: ItemTable) -> Self {
        Self {
            table,
            joins: Vec::new(),
            filters: Vec::new(),
            params: Vec::new(),
        }
    }

    pub(crate) fn table(&self) -> ItemTable {
        self.table
    }

    fn filter(mut self, clause: &'static str, param: Value) -> Self {
        self.filters.push(clause);
        self.params.push(param);
        self
    }

    fn role(self, clause: &'static str, role: Option<Role>) -> Self {
        match role {
            Some(role) => self.filter(clause, Value::Integer(role.code())),
            None => self,
        }
    }

    /// Restricts the yielded items to one schema.
    pub(crate) fn schema(self, schema_id: &str) -> Self {
        self.filter("t.schema_id = ?", Value::Text(schema_id.to_owned()))
    }

    pub(crate) fn excluding(self, rid: Rid) -> Self {
        self.filter("t.rid <> ?", Value::Integer(rid.0))
    }

    /// Edges incident to `node`, optionally only where it plays `role`.
    pub(crate) fn edges_of_node(node: Rid, role: Option<Role>) -> Self {
        let mut query = Self::edges();
        query
            .joins
            .push("JOIN edge_incidence i ON i.edge_rid = t.rid");
        query
            .filter("i.node_rid = ?", Value::Integer(node.0))
            .role("i.role = ?", role)
    }

    /// Nodes incident to `edge`, optionally only those playing `role`.
    pub(crate) fn nodes_of_edge(edge: Rid, role: Option<Role>) -> Self {
        let mut query = Self::nodes();
        query
            .joins
            .push("JOIN edge_incidence i ON i.node_rid = t.rid");
        query
            .filter("i.edge_rid = ?", Value::Integer(edge.0))
            .role("i.role = ?", role)
    }

    /// Nodes sharing an edge with `node`, excluding `node` itself.
    ///
    /// `own` restricts the role `node` plays on the shared edge, `other` the
    /// role of the yielded node, and `edge_schema` the shared edge's schema.
    pub(crate) fn nodes_adjacent_to_node(
        node: Rid,
        own: Option<Role>,
        other: Option<Role>,
        edge_schema: Option<&str>,
    ) -> Self {
        let mut query = Self::nodes();
        query
            .joins
            .push("JOIN edge_incidence i2 ON i2.node_rid = t.rid");
        query
            .joins
            .push("JOIN edge_incidence i1 ON i1.edge_rid = i2.edge_rid");
        let mut query = query
            .filter("i1.node_rid = ?", Value::Integer(node.0))
            .excluding(node)
            .role("i1.role = ?", own)
            .role("i2.role = ?", other);
        if let Some(schema_id) = edge_schema {
            query.joins.push("JOIN edges e ON e.rid = i1.edge_rid");
            query = query.filter("e.schema_id = ?", Value::Text(schema_id.to_owned()));
        }
        query
    }

    /// Nodes sharing the edge `edge` with `node`, excluding `node` itself.
    pub(crate) fn nodes_adjacent_via(node: Rid, edge: Rid) -> Self {
        Self::nodes_adjacent_to_node(node, None, None, None)
            .filter("i1.edge_rid = ?", Value::Integer(edge.0))
    }

    /// Edges sharing a node with `edge`, excluding `edge` itself, optionally
    /// only through the shared node `via`.
    pub(crate) fn edges_adjacent_to_edge(edge: Rid, via: Option<Rid>) -> Self {
        let mut query = Self::edges();
        query
            .joins
            .push("JOIN edge_incidence i2 ON i2.edge_rid = t.rid");
        query
            .joins
            .push("JOIN edge_incidence i1 ON i1.node_rid = i2.node_rid");
        let query = query
            .filter("i1.edge_rid = ?", Value::Integer(edge.0))
            .excluding(edge);
        match via {
            Some(node) => query.filter("i1.node_rid = ?", Value::Integer(node.0)),
            None => query,
        }
    }

    /// Matches no rows; used for handles that belong to another store.
    pub(crate) fn nothing(mut self) -> Self {
        self.filters.push("0");
        self
    }

    fn body(&self) -> String {
        let mut sql = format!("FROM {} t", self.table.name());
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql.push_str(" WHERE ");
        if self.filters.is_empty() {
            sql.push('1');
        } else {
            sql.push_str(&self.filters.join(" AND "));
        }
        sql
    }

    /// One cursor page: rows with `t.rid > ?` ordered by rid, at most `?` of them.
    pub(crate) fn page_sql(&self) -> String {
        format!(
            "SELECT DISTINCT t.rid, t.schema_id, t.object_id, {} {} AND t.rid > ? ORDER BY t.rid LIMIT ?",
            self.table.kind_column(),
            self.body()
        )
    }

    pub(crate) fn page_params(&self, after: Rid, limit: usize) -> Vec<Value> {
        let mut params = self.params.clone();
        params.push(Value::Integer(after.0));
        params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        params
    }

    pub(crate) fn count_sql(&self) -> String {
        format!("SELECT COUNT(DISTINCT t.rid) {}", self.body())
    }

    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }

    /// Whether the row `t.rid = ?` is part of the result.
    pub(crate) fn contains_sql(&self) -> String {
        format!("SELECT EXISTS(SELECT 1 {} AND t.rid = ?)", self.body())
    }

    pub(crate) fn contains_params(&self, rid: Rid) -> Vec<Value> {
        let mut params = self.params.clone();
        params.push(Value::Integer(rid.0));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn scan_pages_by_rid() {
        let query = ItemQuery::nodes().schema("person");
        let sql = query.page_sql();
        assert_eq!(
            sql,
            "SELECT DISTINCT t.rid, t.schema_id, t.object_id, NULL FROM nodes t \
             WHERE t.schema_id = ? AND t.rid > ? ORDER BY t.rid LIMIT ?"
        );
        assert_eq!(placeholders(&sql), query.page_params(Rid(0), 10).len());
    }

    #[test]
    fn adjacency_joins_through_incidence() {
        let query = ItemQuery::nodes_adjacent_to_node(
            Rid(7),
            Some(Role::Source),
            Some(Role::Target),
            Some("cites"),
        );
        let sql = query.page_sql();
        assert!(sql.contains("JOIN edge_incidence i2 ON i2.node_rid = t.rid"));
        assert!(sql.contains("JOIN edge_incidence i1 ON i1.edge_rid = i2.edge_rid"));
        assert!(sql.contains("JOIN edges e ON e.rid = i1.edge_rid"));
        assert!(sql.contains("t.rid <> ?"));
        assert_eq!(placeholders(&sql), query.page_params(Rid(0), 10).len());
        assert_eq!(
            query.params()[..4],
            [
                Value::Integer(7),
                Value::Integer(7),
                Value::Integer(Role::Source.code()),
                Value::Integer(Role::Target.code()),
            ]
        );
    }

    #[test]
    fn edge_adjacency_excludes_self() {
        let query = ItemQuery::edges_adjacent_to_edge(Rid(3), Some(Rid(9))).schema("knows");
        let sql = query.count_sql();
        assert!(sql.starts_with("SELECT COUNT(DISTINCT t.rid) FROM edges t"));
        assert!(sql.contains("i1.edge_rid = ? AND t.rid <> ? AND i1.node_rid = ?"));
        assert_eq!(placeholders(&sql), query.params().len());
        let sql = query.contains_sql();
        assert_eq!(placeholders(&sql), query.contains_params(Rid(1)).len());
    }
}
