//! SQLite engine (bundled library via `rusqlite`).

use async_trait::async_trait;
use casefile_schema::{ColumnInfo, ForeignKeyInfo, IntrospectionError, SchemaIntrospection};
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::{Database, Engine, EngineHandle, EngineLoader, ResultSet, Value};
use crate::error::{EngineError, InitializationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteOptions {
    /// Enforce foreign-key constraints on writes (`PRAGMA foreign_keys`).
    pub foreign_keys: bool,
    /// Oldest library accepted, in `sqlite3_libversion_number` form.
    pub min_version: i32,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            foreign_keys: false,
            min_version: 3_024_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SqliteLoader {
    pub options: SqliteOptions,
}

impl SqliteLoader {
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl EngineLoader for SqliteLoader {
    async fn load(&self) -> Result<EngineHandle, InitializationError> {
        let found = rusqlite::version_number();
        if found < self.options.min_version {
            return Err(InitializationError::new(format!(
                "SQLite {} is older than the required {}",
                rusqlite::version(),
                self.options.min_version
            )));
        }

        // Probe that the host can actually create an instance.
        let probe = Connection::open_in_memory()
            .map_err(|e| InitializationError::new(format!("cannot open SQLite: {e}")))?;
        let version: String = probe
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|e| InitializationError::new(format!("SQLite probe failed: {e}")))?;

        Ok(Arc::new(SqliteEngine {
            options: self.options.clone(),
            version,
        }))
    }
}

#[derive(Debug)]
pub struct SqliteEngine {
    options: SqliteOptions,
    version: String,
}

#[async_trait]
impl Engine for SqliteEngine {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> String {
        self.version.clone()
    }

    async fn open(&self) -> Result<Box<dyn Database>, EngineError> {
        let conn = Connection::open_in_memory().map_err(engine_error)?;
        if self.options.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(engine_error)?;
        }
        Ok(Box::new(SqliteDatabase { conn }))
    }
}

pub struct SqliteDatabase {
    conn: Connection,
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn seed(&mut self, statement: &str) -> Result<(), EngineError> {
        self.conn.execute_batch(statement).map_err(engine_error)
    }

    fn execute(&mut self, sql: &str) -> Result<Vec<ResultSet>, EngineError> {
        let mut results = Vec::new();
        let mut batch = Batch::new(&self.conn, sql);
        while let Some(mut stmt) = batch.next().map_err(engine_error)? {
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let width = stmt.column_count();

            let mut rows = Vec::new();
            let mut cursor = stmt.query([]).map_err(engine_error)?;
            while let Some(row) = cursor.next().map_err(engine_error)? {
                let mut values = Vec::with_capacity(width);
                for idx in 0..width {
                    values.push(Value::from(row.get_ref(idx).map_err(engine_error)?));
                }
                rows.push(values);
            }

            // Statements that return no rows contribute no result set.
            if !rows.is_empty() {
                results.push(ResultSet { columns, rows });
            }
        }
        Ok(results)
    }
}

impl SchemaIntrospection for SqliteDatabase {
    fn list_tables(&self) -> Result<Vec<String>, IntrospectionError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_' \
                 ORDER BY rowid",
            )
            .map_err(introspection_error)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(introspection_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(introspection_error)?;
        Ok(names)
    }

    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, IntrospectionError> {
        // pragma_table_info: cid, name, type, notnull, dflt_value, pk
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(introspection_error)?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    primary_key_index: row.get(2)?,
                })
            })
            .map_err(introspection_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(introspection_error)?;
        Ok(columns)
    }

    fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, IntrospectionError> {
        // pragma_foreign_key_list: id, seq, table, from, to, on_update, on_delete, match
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) \
                 ORDER BY id DESC, seq",
            )
            .map_err(introspection_error)?;
        let keys = stmt
            .query_map([table], |row| {
                Ok(ForeignKeyInfo {
                    id: row.get(0)?,
                    to_table: row.get(1)?,
                    from_column: row.get(2)?,
                    to_column: row.get(3)?,
                })
            })
            .map_err(introspection_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(introspection_error)?;
        Ok(keys)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            // Invalid UTF-8 in a TEXT cell is returned as raw bytes.
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// Keep SQLite's own message (`no such table: x`) without rusqlite's framing.
fn engine_error(err: rusqlite::Error) -> EngineError {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => EngineError::new(message),
        rusqlite::Error::SqlInputError { msg, .. } => EngineError::new(msg),
        other => EngineError::new(other.to_string()),
    }
}

fn introspection_error(err: rusqlite::Error) -> IntrospectionError {
    IntrospectionError::new(engine_error(err).message)
}
