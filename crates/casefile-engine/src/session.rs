//! Case sessions.
//!
//! The [`SessionManager`] owns at most one live database. Loading a case:
//!
//! 1. looks up the case statements, then takes a new request token
//!    (monotonic),
//! 2. tears down whatever session is active,
//! 3. opens a fresh empty database and runs the case statements in order,
//! 4. installs the session only if its token is still the latest.
//!
//! A slower, older load that finishes after a newer one was issued is
//! discarded without touching the active session.

use casefile_catalog::CaseCatalog;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::bootstrap::EngineBootstrap;
use crate::engine::Database;
use crate::error::SessionError;

// ============================================================================
// Schema source
// ============================================================================

/// Where case statements come from.
pub trait SchemaSource: Send + Sync {
    fn schema_for(&self, puzzle_id: &str) -> Option<Vec<String>>;
}

impl SchemaSource for CaseCatalog {
    fn schema_for(&self, puzzle_id: &str) -> Option<Vec<String>> {
        self.get(puzzle_id).map(|case| case.schema.clone())
    }
}

impl SchemaSource for HashMap<String, Vec<String>> {
    fn schema_for(&self, puzzle_id: &str) -> Option<Vec<String>> {
        self.get(puzzle_id).cloned()
    }
}

// ============================================================================
// Session
// ============================================================================

/// A live database seeded for one case.
pub struct Session {
    puzzle_id: String,
    generation: u64,
    db: Mutex<Option<Box<dyn Database>>>,
}

impl Session {
    pub fn puzzle_id(&self) -> &str {
        &self.puzzle_id
    }

    /// Token of the load request that created this session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_closed(&self) -> bool {
        self.db.lock().is_none()
    }

    /// Run `f` against the database, or fail if the session was torn down.
    pub(crate) fn with_db<R>(
        &self,
        f: impl FnOnce(&mut dyn Database) -> Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        let mut guard = self.db.lock();
        match guard.as_deref_mut() {
            Some(db) => f(db),
            None => Err(SessionError::Superseded {
                puzzle_id: self.puzzle_id.clone(),
            }),
        }
    }

    fn close(&self) {
        self.db.lock().take();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("puzzle_id", &self.puzzle_id)
            .field("generation", &self.generation)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Session manager
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A new session was seeded and is now active.
    Loaded,
    /// The case was already active; nothing changed.
    AlreadyActive,
    /// A newer request was issued before this one finished; its result was
    /// discarded.
    Superseded,
}

#[derive(Default)]
struct ManagerState {
    active: Option<Arc<Session>>,
    latest: u64,
}

pub struct SessionManager {
    bootstrap: Arc<EngineBootstrap>,
    source: Arc<dyn SchemaSource>,
    state: Mutex<ManagerState>,
}

impl SessionManager {
    pub fn new(bootstrap: Arc<EngineBootstrap>, source: Arc<dyn SchemaSource>) -> Self {
        Self {
            bootstrap,
            source,
            state: Mutex::new(ManagerState::default()),
        }
    }

    pub fn bootstrap(&self) -> &Arc<EngineBootstrap> {
        &self.bootstrap
    }

    pub async fn load_schema(&self, puzzle_id: &str) -> Result<LoadOutcome, SessionError> {
        let statements = self
            .source
            .schema_for(puzzle_id)
            .ok_or_else(|| SessionError::UnknownPuzzle {
                puzzle_id: puzzle_id.to_string(),
            })?;

        let token = {
            let mut state = self.state.lock();
            state.latest += 1;
            let token = state.latest;

            if let Some(active) = &state.active {
                if active.puzzle_id == puzzle_id {
                    tracing::debug!(puzzle_id, "case already loaded");
                    return Ok(LoadOutcome::AlreadyActive);
                }
            }
            if let Some(previous) = state.active.take() {
                tracing::info!(puzzle_id = %previous.puzzle_id, "closing case session");
                previous.close();
            }
            token
        };

        // A failure that lands after a newer request was issued belongs to
        // a case the player already left; report it as superseded.
        let engine = match self.bootstrap.initialize().await {
            Ok(engine) => engine,
            Err(_) if !self.is_latest(token) => return Ok(self.discard(puzzle_id, token)),
            Err(e) => return Err(e.into()),
        };
        if !self.is_latest(token) {
            return Ok(self.discard(puzzle_id, token));
        }

        let mut db = match engine.open().await {
            Ok(db) => db,
            Err(_) if !self.is_latest(token) => return Ok(self.discard(puzzle_id, token)),
            Err(e) => {
                return Err(SessionError::SchemaLoad {
                    puzzle_id: puzzle_id.to_string(),
                    statement: 0,
                    message: e.message,
                })
            }
        };

        for (idx, statement) in statements.iter().enumerate() {
            if !self.is_latest(token) {
                return Ok(self.discard(puzzle_id, token));
            }
            if let Err(e) = db.seed(statement).await {
                if !self.is_latest(token) {
                    return Ok(self.discard(puzzle_id, token));
                }
                tracing::error!(
                    puzzle_id,
                    statement = idx,
                    error = %e,
                    "seed statement failed"
                );
                return Err(SessionError::SchemaLoad {
                    puzzle_id: puzzle_id.to_string(),
                    statement: idx,
                    message: e.message,
                });
            }
            tokio::task::yield_now().await;
        }

        let mut state = self.state.lock();
        if state.latest != token {
            drop(state);
            return Ok(self.discard(puzzle_id, token));
        }
        state.active = Some(Arc::new(Session {
            puzzle_id: puzzle_id.to_string(),
            generation: token,
            db: Mutex::new(Some(db)),
        }));
        tracing::info!(
            puzzle_id,
            generation = token,
            statements = statements.len(),
            "case session ready"
        );
        Ok(LoadOutcome::Loaded)
    }

    pub fn active_session(&self) -> Result<Arc<Session>, SessionError> {
        self.state
            .lock()
            .active
            .clone()
            .ok_or(SessionError::NotInitialized)
    }

    pub fn active_puzzle(&self) -> Option<String> {
        self.state
            .lock()
            .active
            .as_ref()
            .map(|s| s.puzzle_id.clone())
    }

    /// Tear down the active session and cancel any in-flight load.
    pub fn unload(&self) {
        let mut state = self.state.lock();
        state.latest += 1;
        if let Some(previous) = state.active.take() {
            tracing::info!(puzzle_id = %previous.puzzle_id, "closing case session");
            previous.close();
        }
    }

    fn is_latest(&self, token: u64) -> bool {
        self.state.lock().latest == token
    }

    fn discard(&self, puzzle_id: &str, token: u64) -> LoadOutcome {
        tracing::warn!(puzzle_id, token, "discarding superseded case load");
        LoadOutcome::Superseded
    }
}
