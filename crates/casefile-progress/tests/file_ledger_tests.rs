use casefile_progress::{AwardOutcome, AwardRequest, JsonFileLedger, LedgerError, ProgressLedger};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

fn request(user: &str, puzzle: &str, xp: u64) -> AwardRequest {
    AwardRequest {
        user_id: user.to_string(),
        puzzle_id: puzzle.to_string(),
        xp_amount: xp,
        completed: BTreeSet::from([puzzle.to_string()]),
    }
}

#[tokio::test]
async fn test_missing_file_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let ledger = JsonFileLedger::new(dir.path().join("progress.json"));

    let progress = ledger.progress("sam").await.unwrap();
    assert_eq!(progress.xp, 0);
    assert!(!ledger.path().exists());
}

#[tokio::test]
async fn test_awards_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("progress.json");

    let ledger = JsonFileLedger::new(&path);
    ledger.award(request("sam", "case-001", 50)).await.unwrap();
    ledger.award(request("alex", "case-002", 75)).await.unwrap();

    let reopened = JsonFileLedger::new(&path);
    let sam = reopened.progress("sam").await.unwrap();
    assert_eq!(sam.xp, 50);
    assert!(sam.has_completed("case-001"));
    assert_eq!(reopened.progress("alex").await.unwrap().xp, 75);

    assert_eq!(
        reopened.award(request("sam", "case-001", 50)).await.unwrap(),
        AwardOutcome::AlreadyCompleted
    );
    assert_eq!(reopened.progress("sam").await.unwrap().xp, 50);
}

#[tokio::test]
async fn test_concurrent_awards_are_serialized() {
    let dir = TempDir::new().unwrap();
    let ledger = Arc::new(JsonFileLedger::new(dir.path().join("progress.json")));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let ledger = Arc::clone(&ledger);
        tasks.push(tokio::spawn(async move {
            ledger
                .award(request("sam", &format!("case-{i:03}"), 10))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let progress = ledger.progress("sam").await.unwrap();
    assert_eq!(progress.xp, 80);
    assert_eq!(progress.completed_cases.len(), 8);
}

#[tokio::test]
async fn test_corrupt_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");
    std::fs::write(&path, "{ not json").unwrap();

    let ledger = JsonFileLedger::new(&path);
    assert!(matches!(
        ledger.progress("sam").await,
        Err(LedgerError::Corrupt { .. })
    ));
}
