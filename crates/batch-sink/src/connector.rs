//! The sink connector: buffer, commit trigger and raw-statement policy.

use sql_sink::{Destination, TableCreator};
use sql_types::{classify, is_row_shaped, translate_ddl, StatementKind};
use sync_core::{ChangeEvent, CommitOutcome, RawStatement, SinkError, SourceMessage};

use crate::buffer::EventBuffer;
use crate::committer::GroupedCommitter;
use crate::config::ConnectorConfig;

/// One sink connector instance.
///
/// Every entry point takes `&mut self`: a connector has exactly one driver at
/// a time. Entry points return `None` when nothing was flushed or forwarded.
pub struct Connector<D> {
    config: ConnectorConfig,
    destination: D,
    buffer: EventBuffer,
    committer: GroupedCommitter,
}

impl<D: Destination + TableCreator> Connector<D> {
    pub fn new(config: ConnectorConfig, destination: D) -> Self {
        let config = config.normalized();
        Self {
            buffer: EventBuffer::with_capacity(config.batch_size),
            committer: GroupedCommitter::new(&config),
            config,
            destination,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    pub fn committer(&self) -> &GroupedCommitter {
        &self.committer
    }

    /// Number of buffered events.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub async fn insert(&mut self, event: ChangeEvent, retry: bool) -> Option<CommitOutcome> {
        self.enqueue(event, retry).await
    }

    pub async fn update(&mut self, event: ChangeEvent, retry: bool) -> Option<CommitOutcome> {
        self.enqueue(event, retry).await
    }

    pub async fn delete(&mut self, event: ChangeEvent, retry: bool) -> Option<CommitOutcome> {
        self.enqueue(event, retry).await
    }

    /// Buffer an event, flushing synchronously once the batch size is reached.
    pub async fn enqueue(&mut self, event: ChangeEvent, retry: bool) -> Option<CommitOutcome> {
        if retry {
            tracing::debug!(
                "Retry flag set for {} on {}",
                event.event_type,
                event.source_table()
            );
        }
        self.buffer.push(event);
        if self.buffer.len() >= self.config.batch_size {
            self.flush().await
        } else {
            None
        }
    }

    /// Handle raw SQL from statement-based replication.
    ///
    /// Only schema changes are acted upon, and only with auto-create enabled:
    /// pending events are flushed first, then the translated statement is
    /// forwarded. A failed flush is returned and the statement is not run.
    pub async fn query(&mut self, statement: RawStatement, retry: bool) -> Option<CommitOutcome> {
        if retry {
            tracing::debug!("Retry flag set for query: {}", statement.sql);
        }
        if !self.config.auto_create_table {
            return None;
        }

        match classify(&statement.sql) {
            StatementKind::TransactionControl => None,
            StatementKind::NonDdl => {
                if !is_row_shaped(&statement.sql) {
                    tracing::warn!("Ignoring unrecognized statement: {}", statement.sql);
                }
                None
            }
            StatementKind::Ddl => self.apply_ddl(statement).await,
        }
    }

    async fn apply_ddl(&mut self, statement: RawStatement) -> Option<CommitOutcome> {
        let flushed = match self.flush().await {
            Some(CommitOutcome::Committed { last_success }) => Some(last_success),
            Some(failed) => {
                tracing::error!("Not applying DDL after failed flush: {}", statement.sql);
                return Some(failed);
            }
            None => None,
        };

        let Some(ddl) = translate_ddl(
            self.committer.dialect(),
            self.committer.resolver(),
            &statement.sql,
            &statement.schema_name,
        ) else {
            tracing::warn!("Not forwarding DDL without a target table: {}", statement.sql);
            return flushed.map(|last_success| CommitOutcome::Committed { last_success });
        };

        match self.destination.execute(&ddl.sql).await {
            Ok(()) => {
                tracing::info!("Applied DDL: {}", ddl.sql);
                self.committer.forget_tables(&ddl.tables);
                Some(CommitOutcome::StatementApplied { statement, flushed })
            }
            Err(error) => {
                tracing::error!("Failed to apply DDL '{}': {error:#}", ddl.sql);
                Some(CommitOutcome::StatementFailed {
                    statement,
                    flushed,
                    error: SinkError::Destination(error),
                })
            }
        }
    }

    /// Explicit commit signal from the upstream dispatcher.
    pub async fn commit(&mut self, retry: bool) -> Option<CommitOutcome> {
        if retry {
            tracing::debug!("Retry flag set for commit");
        }
        self.flush().await
    }

    /// Idle-timer commit.
    pub async fn timeout_commit(&mut self) -> Option<CommitOutcome> {
        if !self.buffer.is_empty() {
            tracing::debug!("Idle timeout reached with {} pending event(s)", self.buffer.len());
        }
        self.flush().await
    }

    /// Acknowledge an event the dispatcher decided not to deliver.
    pub fn skip(&mut self, event: &ChangeEvent) {
        tracing::debug!(
            "Skipped {} on {}",
            event.event_type,
            event.source_table()
        );
    }

    /// Route one upstream message to the matching entry point.
    pub async fn handle(&mut self, message: SourceMessage, retry: bool) -> Option<CommitOutcome> {
        match message {
            SourceMessage::Row(event) => self.enqueue(event, retry).await,
            SourceMessage::Query(statement) => self.query(statement, retry).await,
            SourceMessage::Commit => self.commit(retry).await,
            SourceMessage::Skip(event) => {
                self.skip(&event);
                None
            }
        }
    }

    /// Destination connectivity probe.
    pub async fn check(&self) -> anyhow::Result<()> {
        self.destination.ping().await
    }

    /// Release the destination. Buffered events are not flushed.
    pub async fn close(self) -> anyhow::Result<()> {
        if !self.buffer.is_empty() {
            tracing::warn!(
                "Closing connector with {} unflushed event(s)",
                self.buffer.len()
            );
        }
        self.destination.close().await
    }

    async fn flush(&mut self) -> Option<CommitOutcome> {
        let batch = self.buffer.take()?;
        let outcome = self.committer.flush(&self.destination, batch).await;
        if outcome.is_success() {
            tracing::info!("Flush {outcome}");
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_sink::MemoryDestination;
    use sync_core::{row, ReplicationPosition};

    fn connector(batch_size: usize, auto_create_table: bool) -> (Connector<MemoryDestination>, MemoryDestination) {
        let destination = MemoryDestination::default();
        let config = ConnectorConfig {
            batch_size,
            auto_create_table,
            ..ConnectorConfig::default()
        };
        (Connector::new(config, destination.clone()), destination)
    }

    fn insert(id: i64) -> ChangeEvent {
        ChangeEvent::insert("db", "t", row! { "id" => id })
    }

    #[tokio::test]
    async fn test_batch_threshold() {
        let (mut connector, destination) = connector(2, false);
        assert!(connector.insert(insert(1), false).await.is_none());
        assert_eq!(connector.pending(), 1);

        let outcome = connector.insert(insert(2), false).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(connector.pending(), 0);

        let txs = destination.transactions();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].statements.len(), 2);
    }

    #[tokio::test]
    async fn test_commit_on_empty_buffer_is_noop() {
        let (mut connector, destination) = connector(10, false);
        assert!(connector.commit(false).await.is_none());
        assert!(connector.timeout_commit().await.is_none());
        assert!(destination.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_query_ignored_without_auto_create() {
        let (mut connector, destination) = connector(10, false);
        connector.insert(insert(1), false).await;
        for sql in ["ALTER TABLE t ADD c INT", "BEGIN", "INSERT INTO t VALUES (1)"] {
            assert!(connector
                .query(RawStatement::new(sql, "db", "t"), false)
                .await
                .is_none());
        }
        assert_eq!(connector.pending(), 1);
        assert!(destination.executed().is_empty());
    }

    #[tokio::test]
    async fn test_ddl_flushes_then_forwards() {
        let (mut connector, destination) = connector(10, true);
        connector.insert(insert(1), false).await;
        let outcome = connector
            .query(RawStatement::new("ALTER TABLE t ADD COLUMN c INT", "db", "t"), false)
            .await
            .unwrap();

        assert!(matches!(outcome, CommitOutcome::StatementApplied { .. }));
        assert_eq!(outcome.last_success().unwrap().rows.len(), 1);
        assert_eq!(connector.pending(), 0);
        assert_eq!(destination.committed_statements().len(), 1);
        assert_eq!(
            destination.executed(),
            vec!["ALTER TABLE `db`.`t` ADD COLUMN c INT"]
        );
        assert!(!connector
            .committer()
            .is_known(&sql_types::TableRef::new("db", "t")));
    }

    #[tokio::test]
    async fn test_failed_flush_blocks_ddl() {
        let (mut connector, destination) = connector(10, true);
        destination.fail_on("INSERT");
        connector.insert(insert(1), false).await;
        let outcome = connector
            .query(RawStatement::new("DROP TABLE t", "db", "t"), false)
            .await
            .unwrap();

        assert!(outcome.first_failed().is_some());
        assert!(destination.executed().is_empty());
    }

    #[tokio::test]
    async fn test_ddl_failure_is_reported() {
        let (mut connector, destination) = connector(10, true);
        destination.fail_on("TRUNCATE");
        let outcome = connector
            .query(RawStatement::new("TRUNCATE TABLE t", "db", "t"), false)
            .await
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::StatementFailed { .. }));
        assert!(outcome.last_success().is_none(), "nothing was flushed first");
    }

    #[tokio::test]
    async fn test_ddl_failure_reports_flushed_batch() {
        let (mut connector, destination) = connector(10, true);
        destination.fail_on("ALTER");
        connector
            .insert(insert(1).with_position(ReplicationPosition::new("bin.1", 100)), false)
            .await;
        let statement = RawStatement::new("ALTER TABLE t ADD c INT", "db", "t")
            .with_position(ReplicationPosition::new("bin.1", 200));
        let outcome = connector.query(statement, false).await.unwrap();

        assert!(!outcome.is_success());
        assert_eq!(destination.committed_statements().len(), 1);
        assert_eq!(
            outcome.flushed_position(),
            Some(&ReplicationPosition::new("bin.1", 100))
        );
        assert_eq!(
            outcome.failure_position(),
            Some(&ReplicationPosition::new("bin.1", 200))
        );
    }

    #[tokio::test]
    async fn test_untranslatable_ddl_returns_flush_outcome() {
        let (mut connector, destination) = connector(10, true);
        assert!(connector
            .query(RawStatement::new("CREATE DATABASE analytics", "db", ""), false)
            .await
            .is_none());

        connector.insert(insert(1), false).await;
        let outcome = connector
            .query(RawStatement::new("CREATE INDEX i ON t (id)", "db", "t"), false)
            .await
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed { .. }));
        assert!(destination.executed().is_empty());
    }

    #[tokio::test]
    async fn test_handle_routes_messages() {
        let (mut connector, destination) = connector(10, false);
        assert!(connector
            .handle(SourceMessage::Row(insert(1)), false)
            .await
            .is_none());
        assert!(connector
            .handle(SourceMessage::Skip(insert(2)), false)
            .await
            .is_none());
        assert_eq!(connector.pending(), 1);
        let outcome = connector.handle(SourceMessage::Commit, true).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(destination.committed_statements().len(), 1);
    }

    #[tokio::test]
    async fn test_check_and_close() {
        let (connector, destination) = connector(10, false);
        connector.check().await.unwrap();
        destination.set_unreachable(true);
        assert!(connector.check().await.is_err());
        connector.close().await.unwrap();
        assert!(destination.is_closed());
    }
}
