//! Table layout of the relational backing store.

use crate::types::SchemaKind;

/// `edges.kind` for undirected edges.
pub(crate) const EDGE_KIND_UNDIRECTED: i64 = 0;
/// `edges.kind` for directed edges.
pub(crate) const EDGE_KIND_DIRECTED: i64 = 1;

pub(crate) const BASE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    rid INTEGER PRIMARY KEY AUTOINCREMENT,
    schema_id TEXT NOT NULL,
    object_id TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS nodes_item_idx ON nodes (schema_id, object_id);
CREATE TABLE IF NOT EXISTS edges (
    rid INTEGER PRIMARY KEY AUTOINCREMENT,
    schema_id TEXT NOT NULL,
    object_id TEXT NOT NULL,
    kind INTEGER NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS edges_item_idx ON edges (schema_id, object_id);
CREATE TABLE IF NOT EXISTS edge_incidence (
    edge_rid INTEGER NOT NULL REFERENCES edges (rid) ON DELETE CASCADE,
    role INTEGER NOT NULL,
    node_rid INTEGER NOT NULL REFERENCES nodes (rid) ON DELETE CASCADE
);
CREATE UNIQUE INDEX IF NOT EXISTS edge_incidence_idx ON edge_incidence (edge_rid, role, node_rid);
CREATE INDEX IF NOT EXISTS edge_incidence_node_idx ON edge_incidence (node_rid);
CREATE TABLE IF NOT EXISTS schema_registry (
    schema_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    definition TEXT NOT NULL
);
";

pub(crate) const INSERT_NODE: &str =
    "INSERT INTO nodes (rid, schema_id, object_id) VALUES (?1, ?2, ?3)";
pub(crate) const INSERT_EDGE: &str =
    "INSERT INTO edges (rid, schema_id, object_id, kind) VALUES (?1, ?2, ?3, ?4)";
pub(crate) const INSERT_INCIDENCE: &str =
    "INSERT INTO edge_incidence (edge_rid, role, node_rid) VALUES (?1, ?2, ?3)";
pub(crate) const SELECT_NODE_RID: &str =
    "SELECT rid FROM nodes WHERE schema_id = ?1 AND object_id = ?2";
pub(crate) const SELECT_EDGE_RID: &str =
    "SELECT rid, kind FROM edges WHERE schema_id = ?1 AND object_id = ?2";
pub(crate) const SELECT_INCIDENCE: &str =
    "SELECT EXISTS(SELECT 1 FROM edge_incidence WHERE edge_rid = ?1 AND role = ?2 AND node_rid = ?3)";
pub(crate) const COUNT_ROLE: &str =
    "SELECT COUNT(*) FROM edge_incidence WHERE edge_rid = ?1 AND role = ?2";
pub(crate) const DELETE_INCIDENCE: &str =
    "DELETE FROM edge_incidence WHERE edge_rid = ?1 AND role = ?2 AND node_rid = ?3";
pub(crate) const DELETE_EDGE_INCIDENCE: &str = "DELETE FROM edge_incidence WHERE edge_rid = ?1";
pub(crate) const DELETE_NODE_INCIDENCE: &str = "DELETE FROM edge_incidence WHERE node_rid = ?1";
pub(crate) const DELETE_NODE: &str = "DELETE FROM nodes WHERE rid = ?1";
pub(crate) const DELETE_EDGE: &str = "DELETE FROM edges WHERE rid = ?1";

/// Highest rid ever handed out for a node, removed rows included.
pub(crate) const LAST_NODE_RID: &str = "SELECT MAX(
    COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'nodes'), 0),
    COALESCE((SELECT MAX(rid) FROM nodes), 0)
)";
/// Highest rid ever handed out for an edge, removed rows included.
pub(crate) const LAST_EDGE_RID: &str = "SELECT MAX(
    COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'edges'), 0),
    COALESCE((SELECT MAX(rid) FROM edges), 0)
)";
pub(crate) const NODE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM nodes WHERE rid = ?1)";
pub(crate) const EDGE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM edges WHERE rid = ?1)";
pub(crate) const COUNT_SCHEMA_ITEMS: &str =
    "SELECT (SELECT COUNT(*) FROM nodes WHERE schema_id = ?1) \
     + (SELECT COUNT(*) FROM edges WHERE schema_id = ?1)";

pub(crate) const SELECT_NODE_IDS: &str = "SELECT rid, schema_id, object_id FROM nodes ORDER BY rid";
pub(crate) const SELECT_EDGE_IDS: &str = "SELECT rid, schema_id, object_id FROM edges ORDER BY rid";
pub(crate) const SELECT_SCHEMA_NODE_IDS: &str =
    "SELECT rid, schema_id, object_id FROM nodes WHERE schema_id = ?1 ORDER BY rid";
pub(crate) const SELECT_SCHEMA_EDGE_IDS: &str =
    "SELECT rid, schema_id, object_id FROM edges WHERE schema_id = ?1 ORDER BY rid";
pub(crate) const COUNT_NODES: &str = "SELECT COUNT(*) FROM nodes";
pub(crate) const COUNT_EDGES: &str = "SELECT COUNT(*) FROM edges";

pub(crate) const DELETE_ALL_INCIDENCE: &str = "DELETE FROM edge_incidence";
pub(crate) const DELETE_ALL_NODES: &str = "DELETE FROM nodes";
pub(crate) const DELETE_ALL_EDGES: &str = "DELETE FROM edges";
pub(crate) const DELETE_SCHEMA_NODE_INCIDENCE: &str =
    "DELETE FROM edge_incidence WHERE node_rid IN (SELECT rid FROM nodes WHERE schema_id = ?1)";
pub(crate) const DELETE_SCHEMA_EDGE_INCIDENCE: &str =
    "DELETE FROM edge_incidence WHERE edge_rid IN (SELECT rid FROM edges WHERE schema_id = ?1)";
pub(crate) const DELETE_SCHEMA_NODES: &str = "DELETE FROM nodes WHERE schema_id = ?1";
pub(crate) const DELETE_SCHEMA_EDGES: &str = "DELETE FROM edges WHERE schema_id = ?1";

/// Incidences of a node with the number of nodes sharing each role on the edge.
pub(crate) const NODE_INCIDENCES: &str = "
SELECT i.edge_rid, i.role, e.schema_id, e.object_id,
       (SELECT COUNT(*) FROM edge_incidence c WHERE c.edge_rid = i.edge_rid AND c.role = i.role)
FROM edge_incidence i JOIN edges e ON e.rid = i.edge_rid
WHERE i.node_rid = ?1
ORDER BY i.edge_rid";

/// Edges that lose a required endpoint when the nodes of schema `?1` go:
/// a directed edge left without a source or a target, or an undirected edge
/// left connecting fewer than two nodes.
pub(crate) const SCHEMA_DOOMED_EDGES: &str = "
SELECT e.rid, e.schema_id, e.object_id FROM edges e
WHERE EXISTS (
        SELECT 1 FROM edge_incidence i JOIN nodes n ON n.rid = i.node_rid
        WHERE i.edge_rid = e.rid AND n.schema_id = ?1)
  AND ((e.kind = 1 AND (
            NOT EXISTS (
                SELECT 1 FROM edge_incidence i JOIN nodes n ON n.rid = i.node_rid
                WHERE i.edge_rid = e.rid AND i.role = 1 AND n.schema_id <> ?1)
         OR NOT EXISTS (
                SELECT 1 FROM edge_incidence i JOIN nodes n ON n.rid = i.node_rid
                WHERE i.edge_rid = e.rid AND i.role = 2 AND n.schema_id <> ?1)))
    OR (e.kind = 0 AND (
            SELECT COUNT(*) FROM edge_incidence i JOIN nodes n ON n.rid = i.node_rid
            WHERE i.edge_rid = e.rid AND n.schema_id <> ?1) < 2))
ORDER BY e.rid";

pub(crate) const LOAD_SCHEMAS: &str =
    "SELECT schema_id, definition FROM schema_registry ORDER BY schema_id";
pub(crate) const SAVE_SCHEMA: &str =
    "INSERT OR REPLACE INTO schema_registry (schema_id, kind, definition) VALUES (?1, ?2, ?3)";
pub(crate) const DELETE_SCHEMA: &str = "DELETE FROM schema_registry WHERE schema_id = ?1";

/// Name of the attribute table backing `schema_id`.
///
/// `schema_id` must already satisfy [`crate::types::validate_schema_id`].
pub(crate) fn attribute_table(schema_id: &str) -> String {
    format!("\"schema_{schema_id}\"")
}

/// Drops any stale table and creates the attribute table for a schema.
pub(crate) fn create_attribute_table(schema_id: &str, kind: SchemaKind) -> String {
    let table = attribute_table(schema_id);
    let foreign_key = match kind {
        SchemaKind::Node => ",\n    FOREIGN KEY (rid) REFERENCES nodes (rid) ON DELETE CASCADE",
        SchemaKind::DirectedEdge | SchemaKind::UndirectedEdge => {
            ",\n    FOREIGN KEY (rid) REFERENCES edges (rid) ON DELETE CASCADE"
        }
        SchemaKind::Graph => "",
    };
    format!(
        "DROP TABLE IF EXISTS {table};
CREATE TABLE {table} (
    rid INTEGER NOT NULL,
    feature_id TEXT NOT NULL,
    value TEXT NOT NULL,
    probability TEXT,
    PRIMARY KEY (rid, feature_id){foreign_key}
);
CREATE INDEX \"schema_{schema_id}_feature_idx\" ON {table} (feature_id);"
    )
}

pub(crate) fn drop_attribute_table(schema_id: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", attribute_table(schema_id))
}

pub(crate) fn select_feature(schema_id: &str) -> String {
    format!(
        "SELECT value, probability FROM {} WHERE rid = ?1 AND feature_id = ?2",
        attribute_table(schema_id)
    )
}

pub(crate) fn select_item_features(schema_id: &str) -> String {
    format!(
        "SELECT feature_id, value, probability FROM {} WHERE rid = ?1",
        attribute_table(schema_id)
    )
}

pub(crate) fn upsert_feature(schema_id: &str) -> String {
    format!(
        "INSERT OR REPLACE INTO {} (rid, feature_id, value, probability) VALUES (?1, ?2, ?3, ?4)",
        attribute_table(schema_id)
    )
}

pub(crate) fn delete_feature(schema_id: &str) -> String {
    format!(
        "DELETE FROM {} WHERE rid = ?1 AND feature_id = ?2",
        attribute_table(schema_id)
    )
}

/// Deletes `count` features of one item in a single statement.
pub(crate) fn delete_features(schema_id: &str, count: usize) -> String {
    format!(
        "DELETE FROM {} WHERE rid = ? AND feature_id IN ({})",
        attribute_table(schema_id),
        placeholders(count)
    )
}

/// Inserts `count` rows in a single statement.
pub(crate) fn insert_features(schema_id: &str, count: usize) -> String {
    let rows = vec!["(?, ?, ?, ?)"; count].join(", ");
    format!(
        "INSERT INTO {} (rid, feature_id, value, probability) VALUES {rows}",
        attribute_table(schema_id)
    )
}

pub(crate) fn delete_feature_everywhere(schema_id: &str) -> String {
    format!(
        "DELETE FROM {} WHERE feature_id = ?1",
        attribute_table(schema_id)
    )
}

pub(crate) fn delete_item_features(schema_id: &str) -> String {
    format!("DELETE FROM {} WHERE rid = ?1", attribute_table(schema_id))
}

pub(crate) fn clear_attribute_table(schema_id: &str) -> String {
    format!("DELETE FROM {}", attribute_table(schema_id))
}

pub(crate) fn count_attribute_rows(schema_id: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", attribute_table(schema_id))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_tables_have_no_foreign_key() {
        let sql = create_attribute_table("social", SchemaKind::Graph);
        assert!(!sql.contains("FOREIGN KEY"));
        let sql = create_attribute_table("person", SchemaKind::Node);
        assert!(sql.contains("REFERENCES nodes (rid) ON DELETE CASCADE"));
        let sql = create_attribute_table("knows", SchemaKind::UndirectedEdge);
        assert!(sql.contains("REFERENCES edges (rid) ON DELETE CASCADE"));
        assert!(sql.starts_with("DROP TABLE IF EXISTS \"schema_knows\";"));
    }

    #[test]
    fn batched_statements_have_one_placeholder_per_value() {
        let sql = delete_features("person", 3);
        assert_eq!(sql.matches('?').count(), 4);
        let sql = insert_features("person", 2);
        assert_eq!(sql.matches('?').count(), 8);
    }
}
