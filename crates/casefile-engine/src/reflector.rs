//! Schema graph of the active session.

use casefile_schema::{NodePosition, SchemaGraph, DEFAULT_LAYOUT_RADIUS};
use std::sync::Arc;

use crate::error::SessionError;
use crate::session::SessionManager;

pub struct SchemaReflector {
    sessions: Arc<SessionManager>,
    radius: f64,
}

impl SchemaReflector {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            radius: DEFAULT_LAYOUT_RADIUS,
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Rebuild the graph from the live catalog.
    pub fn reflect(&self) -> Result<SchemaGraph, SessionError> {
        let session = self.sessions.active_session()?;
        let graph = session.with_db(|db| Ok(casefile_schema::reflect(&*db)?))?;
        tracing::debug!(
            puzzle_id = session.puzzle_id(),
            tables = graph.tables.len(),
            edges = graph.edges.len(),
            "reflected schema"
        );
        Ok(graph)
    }

    /// Graph plus deterministic node positions.
    pub fn reflect_with_layout(&self) -> Result<(SchemaGraph, Vec<NodePosition>), SessionError> {
        let graph = self.reflect()?;
        let positions = graph.layout(self.radius);
        Ok((graph, positions))
    }
}
