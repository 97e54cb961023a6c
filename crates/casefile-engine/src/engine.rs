//! Engine abstraction.
//!
//! ```text
//!   EngineLoader ──load()──► Engine ──open()──► Database
//!   (once per process)       (handle)           (one per session)
//! ```
//!
//! A `Database` is a fresh, empty, in-process instance. It is seeded with the
//! case statements, then queried and introspected until its session ends.

use async_trait::async_trait;
use casefile_schema::SchemaIntrospection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{EngineError, InitializationError};

/// A single cell, in the engine's own storage class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// Rows produced by one statement, as the engine reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Shared handle to a loaded engine module.
pub type EngineHandle = Arc<dyn Engine>;

#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> Result<EngineHandle, InitializationError>;
}

#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> String;

    /// Construct a new empty database instance.
    async fn open(&self) -> Result<Box<dyn Database>, EngineError>;
}

#[async_trait]
pub trait Database: SchemaIntrospection + Send {
    /// Execute one seed statement.
    async fn seed(&mut self, statement: &str) -> Result<(), EngineError>;

    /// Execute free-form SQL. Returns one result set per statement that
    /// produced at least one row, in statement order.
    fn execute(&mut self, sql: &str) -> Result<Vec<ResultSet>, EngineError>;
}
