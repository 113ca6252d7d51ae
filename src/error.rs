use std::path::PathBuf;

use thiserror::Error;

use crate::types::GraphId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type returned by event listeners.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the graph store.
///
/// Everything except [`GraphError::Storage`], [`GraphError::Open`] and
/// [`GraphError::Io`] is a programmer-error class failure: the store never
/// retries or repairs on the caller's behalf.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A schema id was referenced that was never registered.
    #[error("undefined schema: {0}")]
    UndefinedSchema(String),
    /// A feature id was referenced that the schema does not define.
    #[error("schema {schema} does not define feature {feature}")]
    UndefinedFeature {
        /// Schema that was consulted.
        schema: String,
        /// Missing feature id.
        feature: String,
    },
    /// A schema id was registered twice.
    #[error("schema already defined: {0}")]
    DuplicateSchema(String),
    /// An identifier does not match the accepted grammar.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    /// A schema kind did not match the requested operation.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// The identifier belongs to a different store.
    #[error("{item} belongs to graph {found}, not {expected}")]
    WrongGraph {
        /// Offending identifier.
        item: String,
        /// The store's own graph id.
        expected: GraphId,
        /// Graph id carried by the identifier.
        found: GraphId,
    },
    /// The node already holds that role on the edge.
    #[error("duplicate incidence: {0}")]
    DuplicateIncidence(String),
    /// A structural invariant would be violated, or an expected item is missing.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The referenced node is not a member of this store.
    #[error("not in graph: {0}")]
    NotInGraph(String),
    /// The operation is not permitted on its target.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// A value does not fit its feature definition, or stored text is malformed.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// A statement failed against the backing store.
    #[error("storage failure executing `{statement}`: {source}")]
    Storage {
        /// Statement text that failed.
        statement: String,
        /// Driver error.
        #[source]
        source: rusqlite::Error,
    },
    /// The backing database could not be opened.
    #[error("unable to open backing store at {}: {source}", path.display())]
    Open {
        /// Location that was attempted.
        path: PathBuf,
        /// Driver error.
        #[source]
        source: rusqlite::Error,
    },
    /// I/O error.
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid store options.
    #[error("configuration: {0}")]
    Config(String),
    /// Schema definitions could not be (de)serialized.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    /// An event listener returned an error.
    #[error("listener failed: {0}")]
    Listener(#[source] ListenerError),
}

/// Attaches the failing statement to driver errors.
pub(crate) trait SqlContext<T> {
    fn sql_context(self, statement: &str) -> Result<T>;
}

impl<T> SqlContext<T> for rusqlite::Result<T> {
    fn sql_context(self, statement: &str) -> Result<T> {
        self.map_err(|source| GraphError::Storage {
            statement: statement.to_owned(),
            source,
        })
    }
}
