use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Maximum length of a schema identifier.
pub const MAX_SCHEMA_ID_LEN: usize = 64;

/// Store-local surrogate key of a node or edge row.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Rid(pub i64);

/// Surrogate key addressing the singleton graph item in its attribute table.
pub const GRAPH_RID: Rid = Rid(0);

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks `id` against the schema identifier grammar `[A-Za-z][A-Za-z0-9_]*`.
///
/// Schema ids become part of attribute table names, so nothing outside this
/// grammar is ever interpolated into SQL.
pub fn validate_schema_id(id: &str) -> Result<()> {
    let mut chars = id.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid || id.len() > MAX_SCHEMA_ID_LEN {
        return Err(GraphError::InvalidIdentifier(id.to_owned()));
    }
    Ok(())
}

/// The four kinds of item a schema can describe.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Node schema.
    Node,
    /// Directed edge schema.
    DirectedEdge,
    /// Undirected edge schema.
    UndirectedEdge,
    /// Graph (singleton) schema.
    Graph,
}

impl SchemaKind {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKind::Node => "node",
            SchemaKind::DirectedEdge => "directed_edge",
            SchemaKind::UndirectedEdge => "undirected_edge",
            SchemaKind::Graph => "graph",
        }
    }

    /// Whether the kind describes an edge.
    pub fn is_edge(self) -> bool {
        matches!(self, SchemaKind::DirectedEdge | SchemaKind::UndirectedEdge)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a node plays on an edge; stored as `edge_incidence.role`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    /// Endpoint of an undirected edge.
    Undirected,
    /// Source endpoint of a directed edge.
    Source,
    /// Target endpoint of a directed edge.
    Target,
}

/// `edge_incidence.role` discriminator for undirected endpoints.
pub const ROLE_UNDIRECTED: i64 = 0;
/// `edge_incidence.role` discriminator for sources.
pub const ROLE_SOURCE: i64 = 1;
/// `edge_incidence.role` discriminator for targets.
pub const ROLE_TARGET: i64 = 2;

impl Role {
    /// Integer stored in the incidence table.
    pub const fn code(self) -> i64 {
        match self {
            Role::Undirected => ROLE_UNDIRECTED,
            Role::Source => ROLE_SOURCE,
            Role::Target => ROLE_TARGET,
        }
    }

    /// Decodes a stored discriminator.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            ROLE_UNDIRECTED => Some(Role::Undirected),
            ROLE_SOURCE => Some(Role::Source),
            ROLE_TARGET => Some(Role::Target),
            _ => None,
        }
    }

    /// Lowercase name used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Undirected => "endpoint",
            Role::Source => "source",
            Role::Target => "target",
        }
    }
}

/// Identity of a store and of its singleton graph item.
///
/// Text form is `schema.object`; the object component may not contain `.`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GraphId {
    schema_id: String,
    object_id: String,
}

impl GraphId {
    /// Builds a graph id, validating both components.
    pub fn new(schema_id: impl Into<String>, object_id: impl Into<String>) -> Result<Self> {
        let schema_id = schema_id.into();
        let object_id = object_id.into();
        validate_schema_id(&schema_id)?;
        if object_id.is_empty() || object_id.contains('.') {
            return Err(GraphError::InvalidIdentifier(object_id));
        }
        Ok(Self {
            schema_id,
            object_id,
        })
    }

    /// Schema of the graph item.
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// Object id of the graph item.
    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_id, self.object_id)
    }
}

impl FromStr for GraphId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let (schema, object) = s
            .split_once('.')
            .ok_or_else(|| GraphError::InvalidIdentifier(s.to_owned()))?;
        GraphId::new(schema, object)
    }
}

impl TryFrom<String> for GraphId {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<GraphId> for String {
    fn from(value: GraphId) -> Self {
        value.to_string()
    }
}

/// External identifier of a node or edge: `(graph, schema-id, object-id)`.
///
/// Text form is `graphSchema.graphObject.schema.object`; the trailing object
/// component may itself contain `.`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId {
    graph: GraphId,
    schema_id: String,
    object_id: String,
}

impl ItemId {
    /// Builds an item id, validating the schema component.
    pub fn new(
        graph: GraphId,
        schema_id: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self> {
        let schema_id = schema_id.into();
        let object_id = object_id.into();
        validate_schema_id(&schema_id)?;
        if object_id.is_empty() {
            return Err(GraphError::InvalidIdentifier(object_id));
        }
        Ok(Self {
            graph,
            schema_id,
            object_id,
        })
    }

    /// Assembles an id from components already known to be valid.
    pub(crate) fn from_parts(graph: GraphId, schema_id: String, object_id: String) -> Self {
        Self {
            graph,
            schema_id,
            object_id,
        }
    }

    /// Store the identifier belongs to.
    pub fn graph(&self) -> &GraphId {
        &self.graph
    }

    /// Schema id.
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// Object id, unique within the schema.
    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.graph, self.schema_id, self.object_id)
    }
}

impl FromStr for ItemId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(4, '.');
        let mut next = || {
            parts
                .next()
                .filter(|part| !part.is_empty())
                .ok_or_else(|| GraphError::InvalidIdentifier(s.to_owned()))
        };
        let graph = GraphId::new(next()?, next()?)?;
        let schema_id = next()?;
        let object_id = next()?;
        ItemId::new(graph, schema_id, object_id)
    }
}

impl TryFrom<String> for ItemId {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ItemId> for String {
    fn from(value: ItemId) -> Self {
        value.to_string()
    }
}
