//! Error taxonomy for the engine crate.
//!
//! `Validation` and `Query` are expected: the player typed something the
//! engine (or the empty-input check) rejected, and the message is shown as-is.
//! Everything else signals a failed load, a sequencing mistake or an
//! engine-integration defect and must stay distinguishable from them.

use casefile_schema::ReflectError;

/// Message reported by the engine, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The engine module could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("engine initialization failed: {message}")]
pub struct InitializationError {
    pub message: String,
}

impl InitializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error("failed to load case `{puzzle_id}` (statement {statement}): {message}")]
    SchemaLoad {
        puzzle_id: String,
        /// 0-based index of the failing seed statement.
        statement: usize,
        message: String,
    },

    #[error("no case found with id `{puzzle_id}`")]
    UnknownPuzzle { puzzle_id: String },

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Query { message: String },

    #[error("query result structure is invalid: row {row} has {actual} values for {expected} columns")]
    Structural {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("schema introspection failed: {0}")]
    Introspection(#[from] ReflectError),

    #[error("database not initialized: no case is loaded")]
    NotInitialized,

    #[error("case `{puzzle_id}` is no longer the active session")]
    Superseded { puzzle_id: String },
}

impl SessionError {
    /// Errors the player caused and can fix by editing the query.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, SessionError::Validation(_) | SessionError::Query { .. })
    }
}
