//! Free-form query execution against the active session.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::{ResultSet, Value};
use crate::error::SessionError;
use crate::session::{Session, SessionManager};

/// Normalized query output. Every row has exactly `columns.len()` values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    fn from_result_set(set: ResultSet) -> Result<Self, SessionError> {
        let expected = set.columns.len();
        if let Some((row, values)) = set
            .rows
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != expected)
        {
            tracing::error!(row, expected, actual = values.len(), "result shape mismatch");
            return Err(SessionError::Structural {
                row,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            columns: set.columns,
            rows: set.rows,
        })
    }
}

pub struct QueryExecutor {
    sessions: Arc<SessionManager>,
}

impl QueryExecutor {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    pub fn run(&self, sql: &str) -> Result<QueryResult, SessionError> {
        let session = self.sessions.active_session()?;
        run_on(&session, sql)
    }

    /// Like [`run`](Self::run), but only against `puzzle_id`'s session; a
    /// query meant for a case the player already left is rejected.
    pub fn run_for(&self, puzzle_id: &str, sql: &str) -> Result<QueryResult, SessionError> {
        let session = self.sessions.active_session()?;
        if session.puzzle_id() != puzzle_id {
            return Err(SessionError::Superseded {
                puzzle_id: puzzle_id.to_string(),
            });
        }
        run_on(&session, sql)
    }
}

fn run_on(session: &Session, sql: &str) -> Result<QueryResult, SessionError> {
    if sql.trim().is_empty() {
        return Err(SessionError::Validation("Query cannot be empty".to_string()));
    }

    tracing::debug!(puzzle_id = session.puzzle_id(), sql, "dispatching query");
    let sets = session.with_db(|db| {
        db.execute(sql).map_err(|e| SessionError::Query { message: e.message })
    })?;

    match sets.into_iter().next() {
        Some(set) => QueryResult::from_result_set(set),
        None => Ok(QueryResult::default()),
    }
}
