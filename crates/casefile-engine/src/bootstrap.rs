//! One-time engine loading.
//!
//! The in-flight load itself is memoized, not just its result: callers that
//! arrive while the first load is pending attach to the same future. A failed
//! load is forgotten so the next explicit call starts a new attempt.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::engine::{EngineHandle, EngineLoader};
use crate::error::InitializationError;
use crate::sqlite::SqliteLoader;

type PendingLoad = Shared<BoxFuture<'static, Result<EngineHandle, InitializationError>>>;

pub struct EngineBootstrap {
    loader: Arc<dyn EngineLoader>,
    slot: Mutex<Option<PendingLoad>>,
    attempts: AtomicUsize,
}

impl EngineBootstrap {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Process-wide bootstrap backed by the bundled SQLite engine.
    pub fn global() -> Arc<EngineBootstrap> {
        static GLOBAL: OnceLock<Arc<EngineBootstrap>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| {
            Arc::new(EngineBootstrap::new(Arc::new(SqliteLoader::default())))
        }))
    }

    pub async fn initialize(&self) -> Result<EngineHandle, InitializationError> {
        let pending = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    self.attempts.fetch_add(1, Ordering::SeqCst);
                    let loader = Arc::clone(&self.loader);
                    let load: BoxFuture<'static, Result<EngineHandle, InitializationError>> =
                        async move {
                            let handle = loader.load().await?;
                            tracing::info!(
                                engine = handle.name(),
                                version = %handle.version(),
                                "engine loaded"
                            );
                            Ok(handle)
                        }
                        .boxed();
                    let pending = load.shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;
        if let Err(err) = &result {
            let mut slot = self.slot.lock();
            // Only clear our own attempt; a retry may already be in flight.
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
                *slot = None;
                tracing::error!(error = %err, "engine initialization failed");
            }
        }
        result
    }

    /// The loaded engine, if a load has completed successfully.
    pub fn get(&self) -> Option<EngineHandle> {
        let slot = self.slot.lock();
        slot.as_ref()
            .and_then(|pending| pending.peek())
            .and_then(|result| result.as_ref().ok())
            .cloned()
    }

    /// Number of loads started so far.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for EngineBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBootstrap")
            .field("loaded", &self.get().is_some())
            .field("attempts", &self.load_attempts())
            .finish()
    }
}
