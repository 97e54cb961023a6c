use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::{apply_award, AwardOutcome, AwardRequest, LedgerError, ProgressLedger, UserProgress};

/// Process-local ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    users: RwLock<HashMap<String, UserProgress>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<UserProgress> {
        let mut users: Vec<_> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        users
    }
}

#[async_trait]
impl ProgressLedger for InMemoryLedger {
    async fn progress(&self, user_id: &str) -> Result<UserProgress, LedgerError> {
        Ok(self
            .users
            .read()
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserProgress::new(user_id)))
    }

    async fn award(&self, request: AwardRequest) -> Result<AwardOutcome, LedgerError> {
        let mut users = self.users.write();
        let progress = users
            .entry(request.user_id.clone())
            .or_insert_with(|| UserProgress::new(&request.user_id));
        Ok(apply_award(progress, &request))
    }
}
