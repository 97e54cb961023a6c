//! Progress persisted as a single JSON document.
//!
//! Awards are read-modify-write cycles serialized by an async mutex. The
//! document is written to a sibling temp file and renamed into place, so a
//! crash mid-write leaves the previous version intact.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::{apply_award, AwardOutcome, AwardRequest, LedgerError, ProgressLedger, UserProgress};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    users: BTreeMap<String, UserProgress>,
}

#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileLedger {
    /// Ledger backed by `path`. The file is created on the first award.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<LedgerDocument, LedgerError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LedgerDocument::default()),
            Err(source) => {
                return Err(LedgerError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| LedgerError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_document(&self, doc: &LedgerDocument) -> Result<(), LedgerError> {
        let io_err = |source: std::io::Error| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl ProgressLedger for JsonFileLedger {
    async fn progress(&self, user_id: &str) -> Result<UserProgress, LedgerError> {
        let mut doc = self.read_document().await?;
        Ok(doc
            .users
            .remove(user_id)
            .unwrap_or_else(|| UserProgress::new(user_id)))
    }

    async fn award(&self, request: AwardRequest) -> Result<AwardOutcome, LedgerError> {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.read_document().await?;
        let progress = doc
            .users
            .entry(request.user_id.clone())
            .or_insert_with(|| UserProgress::new(&request.user_id));
        let outcome = apply_award(progress, &request);

        if outcome == AwardOutcome::AlreadyCompleted {
            return Ok(outcome);
        }
        self.write_document(&doc).await?;
        tracing::debug!(
            path = %self.path.display(),
            user_id = %request.user_id,
            "progress saved"
        );
        Ok(outcome)
    }
}
