//! Casefile player progress
//!
//! Tracks experience points and solved cases per player, and turns an answer
//! submission into at most one XP award:
//!
//! ```text
//!   answer ──check──► correct? ──no──► Submission { correct: false }
//!                        │
//!                       yes
//!                        │
//!            already in completed set? ──yes──► no award
//!                        │
//!                       no
//!                        ▼
//!             ProgressLedger::award(case id, xp)
//! ```
//!
//! ## Ledgers
//!
//! - [`InMemoryLedger`]: process-local, for tests and anonymous play
//! - [`JsonFileLedger`]: one JSON document on disk, rewritten on every award

pub mod file;
pub mod memory;


pub use file::JsonFileLedger;
pub use memory::InMemoryLedger;

use async_trait::async_trait;
use casefile_catalog::Case;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

// ============================================================================
// Core Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: String,
    pub xp: u64,
    pub completed_cases: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            xp: 0,
            completed_cases: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn has_completed(&self, puzzle_id: &str) -> bool {
        self.completed_cases.contains(puzzle_id)
    }
}

/// Request to credit a solved case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardRequest {
    pub user_id: String,
    pub puzzle_id: String,
    pub xp_amount: u64,
    /// Completed set as the caller saw it, already including `puzzle_id`.
    pub completed: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AwardOutcome {
    Awarded { xp: u64 },
    AlreadyCompleted,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to access progress file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("progress file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode progress: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where player progress lives.
#[async_trait]
pub trait ProgressLedger: Send + Sync {
    /// Current progress; a player with no record starts at zero.
    async fn progress(&self, user_id: &str) -> Result<UserProgress, LedgerError>;

    /// Credit `xp_amount` and record the case as completed, atomically.
    /// A case that is already recorded is a no-op.
    async fn award(&self, request: AwardRequest) -> Result<AwardOutcome, LedgerError>;
}

/// Apply an award to a stored record. Shared by the ledger implementations.
pub(crate) fn apply_award(progress: &mut UserProgress, request: &AwardRequest) -> AwardOutcome {
    if progress.has_completed(&request.puzzle_id) {
        return AwardOutcome::AlreadyCompleted;
    }
    progress
        .completed_cases
        .extend(request.completed.iter().cloned());
    progress.completed_cases.insert(request.puzzle_id.clone());
    progress.xp = progress.xp.saturating_add(request.xp_amount);
    progress.updated_at = Utc::now();
    AwardOutcome::Awarded {
        xp: request.xp_amount,
    }
}

// ============================================================================
// Submission
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub correct: bool,
    /// `None` for wrong answers, anonymous players and already-solved cases.
    pub award: Option<AwardOutcome>,
}

impl Submission {
    pub fn xp_awarded(&self) -> u64 {
        match self.award {
            Some(AwardOutcome::Awarded { xp }) => xp,
            _ => 0,
        }
    }
}

/// Check `answer` against the case and credit a signed-in player on the
/// first correct submission.
pub async fn submit_answer(
    case: &Case,
    answer: &str,
    user_id: Option<&str>,
    ledger: &dyn ProgressLedger,
) -> Result<Submission, LedgerError> {
    if !case.check_answer(answer) {
        tracing::debug!(case = %case.id, "incorrect answer submitted");
        return Ok(Submission {
            correct: false,
            award: None,
        });
    }

    let Some(user_id) = user_id else {
        return Ok(Submission {
            correct: true,
            award: None,
        });
    };

    let progress = ledger.progress(user_id).await?;
    if progress.has_completed(&case.id) {
        tracing::debug!(user_id, case = %case.id, "case already solved, no award");
        return Ok(Submission {
            correct: true,
            award: None,
        });
    }

    let mut completed = progress.completed_cases;
    completed.insert(case.id.clone());
    let outcome = ledger
        .award(AwardRequest {
            user_id: user_id.to_string(),
            puzzle_id: case.id.clone(),
            xp_amount: u64::from(case.xp_reward),
            completed,
        })
        .await?;
    tracing::info!(user_id, case = %case.id, ?outcome, "case solved");

    Ok(Submission {
        correct: true,
        award: Some(outcome),
    })
}
