//! Error types and result definitions

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for topology operations
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Main error type for a topology run.
///
/// Per-entity and per-dataset problems never surface here: they are recovered
/// locally and recorded in the run report. Only structural failures propagate.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// Rule table could not be read or decoded
    #[error("Rule table error: {0}")]
    RuleTable(#[from] RuleTableError),

    /// Output could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Topology file could not be parsed back
    #[error("Parse error: {0}")]
    Parse(String),

    /// Query over a generated topology failed
    #[error("Query error: {0}")]
    Query(String),

    /// Store error
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid IRI in an emitted relation
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// IO error on a specific path
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Built-in pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// User requested abort
    #[error("Run interrupted by user")]
    Interrupted,
}

impl TopologyError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TopologyError::Io { path: path.into(), source }
    }
}

impl From<oxigraph::store::StorageError> for TopologyError {
    fn from(err: oxigraph::store::StorageError) -> Self {
        TopologyError::Store(err.to_string())
    }
}

impl From<oxigraph::sparql::QueryEvaluationError> for TopologyError {
    fn from(err: oxigraph::sparql::QueryEvaluationError) -> Self {
        TopologyError::Query(err.to_string())
    }
}

impl From<oxigraph::io::RdfParseError> for TopologyError {
    fn from(err: oxigraph::io::RdfParseError) -> Self {
        TopologyError::Parse(err.to_string())
    }
}

impl From<oxigraph::model::IriParseError> for TopologyError {
    fn from(err: oxigraph::model::IriParseError) -> Self {
        TopologyError::InvalidIri(err.to_string())
    }
}

/// Failure to obtain a rule table at all (as opposed to individual bad rules,
/// which become [`crate::config::ConfigIssue`]s).
#[derive(Error, Debug)]
pub enum RuleTableError {
    #[error("cannot read rule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rule document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Reason a category dataset could not be made available to the join.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("no dataset file found (tried {})", tried.join(", "))]
    NotFound { tried: Vec<String> },

    #[error("cannot read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}
