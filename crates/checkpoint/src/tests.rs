//! Unit tests for the checkpoint crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sync_core::{row, ChangeEvent, CommitOutcome, RawStatement, ReplicationPosition, SinkError};
use tempfile::TempDir;

use crate::{
    Checkpoint, CheckpointFile, CheckpointID, CheckpointStore, FilesystemStore, Hold, NullStore,
    PositionTracker, SinkCheckpoint,
};

/// Test checkpoint type exercising the trait without the tracker.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct TestCheckpoint {
    value: i64,
    timestamp: DateTime<Utc>,
}

impl Checkpoint for TestCheckpoint {
    const DATABASE_TYPE: &'static str = "test";

    fn to_cli_string(&self) -> String {
        format!("{}:{}", self.value, self.timestamp.to_rfc3339())
    }

    fn from_cli_string(s: &str) -> anyhow::Result<Self> {
        let parts: Vec<&str> = s.splitn(2, ':').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid test checkpoint format: expected 'value:timestamp'");
        }
        Ok(Self {
            value: parts[0].parse()?,
            timestamp: DateTime::parse_from_rfc3339(parts[1])?.with_timezone(&Utc),
        })
    }
}

fn pos(offset: u64) -> ReplicationPosition {
    ReplicationPosition::new("mysql-bin.000001", offset)
}

fn committed(offset: u64) -> CommitOutcome {
    CommitOutcome::Committed {
        last_success: ChangeEvent::insert("db", "t", row! { "id" => 1 }).with_position(pos(offset)),
    }
}

fn failed(offset: Option<u64>) -> CommitOutcome {
    let mut event = ChangeEvent::insert("db", "t", row! { "id" => 1 });
    event.position = offset.map(pos);
    CommitOutcome::Failed {
        first_failed: event,
        error: SinkError::Destination(anyhow::anyhow!("boom")),
    }
}

fn filesystem(tmp: &TempDir) -> Box<dyn CheckpointStore> {
    Box::new(FilesystemStore::new(tmp.path()))
}

// ============================================================================
// CheckpointFile Tests
// ============================================================================

#[test]
fn test_checkpoint_file_parse() {
    let cp = TestCheckpoint {
        value: 42,
        timestamp: Utc::now(),
    };
    let file = CheckpointFile::new(&cp).unwrap();
    assert_eq!(file.database_type(), "test");

    let parsed: TestCheckpoint = file.parse().unwrap();
    assert_eq!(parsed.value, cp.value);
    let diff = Utc::now() - file.created_at();
    assert!(diff.num_seconds() < 5);
}

#[test]
fn test_checkpoint_type_mismatch() {
    let cp = SinkCheckpoint::new(pos(4));
    let file = CheckpointFile::new(&cp).unwrap();

    let result: anyhow::Result<TestCheckpoint> = file.parse();
    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("expected 'test'"));
    assert!(err_msg.contains("found 'binlog'"));
}

#[test]
fn test_sink_checkpoint_cli_string() {
    let cp = SinkCheckpoint::new(pos(4711));
    assert_eq!(cp.to_cli_string(), "mysql-bin.000001:4711");
    let parsed = SinkCheckpoint::from_cli_string("mysql-bin.000002:4").unwrap();
    assert_eq!(parsed.position, ReplicationPosition::new("mysql-bin.000002", 4));
    assert!(SinkCheckpoint::from_cli_string("no-offset").is_err());
}

// ============================================================================
// Store Tests
// ============================================================================

#[tokio::test]
async fn test_filesystem_store_overwrites() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path().join("nested"));
    let id = CheckpointID::new("binlog", "main");

    assert!(store.read_checkpoint(&id).await.unwrap().is_none());
    store.store_checkpoint(&id, "first".to_string()).await.unwrap();
    store.store_checkpoint(&id, "second".to_string()).await.unwrap();

    let stored = store.read_checkpoint(&id).await.unwrap().unwrap();
    assert_eq!(stored.checkpoint_data, "second");
    assert_eq!(stored.name, "main");

    let files: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
    assert_eq!(files.len(), 1, "temporary files must not be left behind");
}

#[tokio::test]
async fn test_filesystem_store_rejects_other_type() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());
    store
        .store_checkpoint(&CheckpointID::new("test", "main"), "x".to_string())
        .await
        .unwrap();
    assert!(store
        .read_checkpoint(&CheckpointID::new("binlog", "main"))
        .await
        .is_err());
}

#[tokio::test]
async fn test_null_store() {
    let id = CheckpointID::new("binlog", "main");
    NullStore.store_checkpoint(&id, "x".to_string()).await.unwrap();
    assert!(NullStore.read_checkpoint(&id).await.unwrap().is_none());
}

// ============================================================================
// PositionTracker Tests
// ============================================================================

#[tokio::test]
async fn test_tracker_advances_and_reloads() {
    let tmp = TempDir::new().unwrap();
    let mut tracker = PositionTracker::load(filesystem(&tmp), "main").await.unwrap();
    assert!(tracker.committed().is_none());

    assert!(tracker.observe(&committed(100)).await.unwrap());
    assert!(tracker.observe(&committed(200)).await.unwrap());
    assert!(!tracker.observe(&committed(150)).await.unwrap());
    assert_eq!(tracker.committed(), Some(&pos(200)));

    let reloaded = PositionTracker::load(filesystem(&tmp), "main").await.unwrap();
    assert_eq!(reloaded.committed(), Some(&pos(200)));
    assert!(reloaded.is_applied(&pos(200)));
    assert!(!reloaded.is_applied(&pos(201)));
}

#[tokio::test]
async fn test_tracker_holds_at_failure() {
    let mut tracker = PositionTracker::load(Box::new(NullStore), "main").await.unwrap();
    tracker.observe(&committed(100)).await.unwrap();

    assert!(!tracker.observe(&failed(Some(300))).await.unwrap());
    assert_eq!(tracker.hold(), Some(&Hold::At(pos(300))));

    // Before the failure: still allowed.
    assert!(tracker.observe(&committed(250)).await.unwrap());
    // At or beyond the failure: held.
    assert!(!tracker.observe(&committed(300)).await.unwrap());
    assert!(!tracker.observe(&committed(400)).await.unwrap());
    assert_eq!(tracker.committed(), Some(&pos(250)));

    // A later failure cannot loosen the hold.
    tracker.observe(&failed(Some(500))).await.unwrap();
    assert_eq!(tracker.hold(), Some(&Hold::At(pos(300))));

    tracker.resolve_failure();
    assert!(tracker.observe(&committed(400)).await.unwrap());
}

#[tokio::test]
async fn test_tracker_failure_without_position_holds_everything() {
    let mut tracker = PositionTracker::load(Box::new(NullStore), "main").await.unwrap();
    tracker.observe(&failed(None)).await.unwrap();
    tracker.observe(&failed(Some(10))).await.unwrap();
    assert_eq!(tracker.hold(), Some(&Hold::Everything));
    assert!(!tracker.observe(&committed(1)).await.unwrap());
    assert!(tracker.committed().is_none());
}

#[tokio::test]
async fn test_tracker_ignores_outcomes_without_position() {
    let mut tracker = PositionTracker::load(Box::new(NullStore), "main").await.unwrap();
    let outcome = CommitOutcome::Committed {
        last_success: ChangeEvent::insert("db", "t", row! { "id" => 1 }),
    };
    assert!(!tracker.observe(&outcome).await.unwrap());
}

fn flushed(offset: u64) -> Option<ChangeEvent> {
    Some(ChangeEvent::insert("db", "t", row! { "id" => 1 }).with_position(pos(offset)))
}

#[tokio::test]
async fn test_tracker_checkpoints_batch_flushed_before_failed_ddl() {
    let tmp = TempDir::new().unwrap();
    let mut tracker = PositionTracker::load(filesystem(&tmp), "main").await.unwrap();
    let outcome = CommitOutcome::StatementFailed {
        statement: RawStatement::new("ALTER TABLE t ADD c INT", "db", "t").with_position(pos(200)),
        flushed: flushed(100),
        error: SinkError::Destination(anyhow::anyhow!("denied")),
    };

    assert!(tracker.observe(&outcome).await.unwrap());
    assert_eq!(tracker.committed(), Some(&pos(100)));
    assert_eq!(tracker.hold(), Some(&Hold::At(pos(200))));

    let reloaded = PositionTracker::load(filesystem(&tmp), "main").await.unwrap();
    assert!(reloaded.is_applied(&pos(100)));
    assert!(!reloaded.is_applied(&pos(200)));
}

#[tokio::test]
async fn test_tracker_checkpoints_batch_flushed_before_unpositioned_ddl() {
    let mut tracker = PositionTracker::load(Box::new(NullStore), "main").await.unwrap();
    let outcome = CommitOutcome::StatementApplied {
        statement: RawStatement::new("ALTER TABLE t ADD c INT", "db", "t"),
        flushed: flushed(100),
    };
    assert!(tracker.observe(&outcome).await.unwrap());
    assert_eq!(tracker.committed(), Some(&pos(100)));
}

#[tokio::test]
async fn test_tracker_flushed_batch_respects_existing_hold() {
    let mut tracker = PositionTracker::load(Box::new(NullStore), "main").await.unwrap();
    tracker.observe(&failed(Some(50))).await.unwrap();
    let outcome = CommitOutcome::StatementApplied {
        statement: RawStatement::new("ALTER TABLE t ADD c INT", "db", "t").with_position(pos(200)),
        flushed: flushed(100),
    };
    assert!(!tracker.observe(&outcome).await.unwrap());
    assert!(tracker.committed().is_none());
}
