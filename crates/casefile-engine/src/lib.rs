//! Casefile engine layer
//!
//! Owns the embedded SQL engine for the lifetime of the process:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CASEFILE ENGINE                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌─────────────┐   once    ┌──────────────┐                  │
//! │  │  Bootstrap  │──────────►│ EngineHandle │                  │
//! │  └─────────────┘           └──────┬───────┘                  │
//! │                                   │ open()                   │
//! │  ┌─────────────┐  seed     ┌──────▼───────┐                  │
//! │  │ Case schema │──────────►│   Session    │ (0 or 1 active)  │
//! │  └─────────────┘           └──┬────────┬──┘                  │
//! │                               │        │                     │
//! │                      ┌────────▼──┐  ┌──▼──────────┐          │
//! │                      │ Executor  │  │  Reflector  │          │
//! │                      └───────────┘  └─────────────┘          │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Load once**: concurrent bootstrap calls share one in-flight load
//! - **Isolated cases**: every case gets a fresh database; switching tears
//!   the old one down first
//! - **Sequenced loads**: only the most recent load request can become active
//! - **Typed errors**: player mistakes are kept apart from integration defects

pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod executor;
pub mod reflector;
pub mod session;
pub mod sqlite;


pub use bootstrap::EngineBootstrap;
pub use engine::{Database, Engine, EngineHandle, EngineLoader, ResultSet, Value};
pub use error::{EngineError, InitializationError, SessionError};
pub use executor::{QueryExecutor, QueryResult};
pub use reflector::SchemaReflector;
pub use session::{LoadOutcome, SchemaSource, Session, SessionManager};
pub use sqlite::{SqliteEngine, SqliteLoader, SqliteOptions};

use std::sync::Arc;

/// Session manager, executor and reflector sharing one manager.
pub struct Workbench {
    pub sessions: Arc<SessionManager>,
    pub executor: QueryExecutor,
    pub reflector: SchemaReflector,
}

impl Workbench {
    pub fn new(bootstrap: Arc<EngineBootstrap>, source: Arc<dyn SchemaSource>) -> Self {
        let sessions = Arc::new(SessionManager::new(bootstrap, source));
        Self {
            executor: QueryExecutor::new(Arc::clone(&sessions)),
            reflector: SchemaReflector::new(Arc::clone(&sessions)),
            sessions,
        }
    }

    /// Workbench over the process-wide SQLite engine.
    pub fn with_global_engine(source: Arc<dyn SchemaSource>) -> Self {
        Self::new(EngineBootstrap::global(), source)
    }
}
