//! Grouped transactional commit.
//!
//! A flush partitions the drained batch by resolved destination table and
//! applies each partition in its own transaction. Groups are independent:
//! there is no atomicity across tables.

use std::collections::HashSet;

use indexmap::IndexMap;
use sql_sink::{Destination, TableCreator};
use sql_types::{build_statement, IdentifierResolver, SqlDialect, TableRef};
use sync_core::{ChangeEvent, CommitOutcome, EventType, SinkError};

use crate::buffer::PendingBatch;
use crate::config::{ConnectorConfig, FailurePolicy};

/// Applies drained batches to a destination, one transaction per table.
#[derive(Debug)]
pub struct GroupedCommitter {
    dialect: SqlDialect,
    resolver: IdentifierResolver,
    failure_policy: FailurePolicy,
    auto_create_table: bool,
    known_tables: HashSet<TableRef>,
}

impl GroupedCommitter {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self {
            dialect: config.dialect,
            resolver: config.resolver(),
            failure_policy: config.failure_policy,
            auto_create_table: config.auto_create_table,
            known_tables: HashSet::new(),
        }
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn is_known(&self, table: &TableRef) -> bool {
        self.known_tables.contains(table)
    }

    /// Drop tables from the known-table cache after a structural change.
    pub fn forget_tables(&mut self, tables: &[TableRef]) {
        for table in tables {
            if self.known_tables.remove(table) {
                tracing::debug!("Forgot known table {table}");
            }
        }
    }

    /// Partition events by destination table. Groups appear in the order of
    /// their table's first event; each group keeps the batch order.
    pub fn group(&self, events: Vec<ChangeEvent>) -> IndexMap<TableRef, Vec<ChangeEvent>> {
        let mut groups: IndexMap<TableRef, Vec<ChangeEvent>> = IndexMap::new();
        for event in events {
            let table = self
                .resolver
                .resolve_names(&event.schema_name, &event.table_name);
            groups.entry(table).or_default().push(event);
        }
        groups
    }

    /// Apply a drained batch.
    ///
    /// Returns `Committed` with the batch's last event if every group
    /// committed, otherwise `Failed` with the first event of the first group
    /// that failed.
    pub async fn flush<D>(&mut self, destination: &D, batch: PendingBatch) -> CommitOutcome
    where
        D: Destination + TableCreator + ?Sized,
    {
        let (events, last) = batch.into_parts();
        let count = events.len();
        let groups = self.group(events);
        tracing::info!(
            "Flushing {count} event(s) across {} table group(s)",
            groups.len()
        );

        let mut first_failure: Option<CommitOutcome> = None;
        for (table, events) in groups {
            if first_failure.is_some() && self.failure_policy == FailurePolicy::AbortRemaining {
                tracing::warn!(
                    "Skipping {} event(s) for {table} after an earlier group failed",
                    events.len()
                );
                continue;
            }

            match self.commit_group(destination, &table, &events).await {
                Ok(()) => {
                    tracing::debug!("Committed {} event(s) to {table}", events.len());
                }
                Err(error) => {
                    tracing::error!(
                        "Commit of {} event(s) to {table} failed: {error}",
                        events.len()
                    );
                    if first_failure.is_none() {
                        let first_failed = events.into_iter().next().unwrap_or_else(|| last.clone());
                        first_failure = Some(CommitOutcome::Failed {
                            first_failed,
                            error,
                        });
                    }
                }
            }
        }

        first_failure.unwrap_or(CommitOutcome::Committed { last_success: last })
    }

    async fn commit_group<D>(
        &mut self,
        destination: &D,
        table: &TableRef,
        events: &[ChangeEvent],
    ) -> Result<(), SinkError>
    where
        D: Destination + TableCreator + ?Sized,
    {
        if self.auto_create_table && !self.known_tables.contains(table) {
            let sample = events
                .iter()
                .filter(|e| e.event_type == EventType::Insert)
                .find_map(|e| e.new_row().map(|row| (row, &e.primary_keys)));
            if let Some((row, primary_keys)) = sample {
                destination
                    .ensure_table(table, row, primary_keys)
                    .await
                    .map_err(SinkError::Destination)?;
                self.known_tables.insert(table.clone());
            }
        }

        let mut tx = destination.begin().await.map_err(SinkError::Destination)?;
        for event in events {
            let applied = match build_statement(self.dialect, table, event) {
                Ok(Some(statement)) => tx
                    .exec(&statement.sql, &statement.params)
                    .await
                    .map(|_| ())
                    .map_err(SinkError::Destination),
                Ok(None) => {
                    tracing::debug!("Nothing to apply for {} on {table}", event.event_type);
                    Ok(())
                }
                Err(error) => Err(error),
            };

            if let Err(error) = applied {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::error!("Rollback of {table} failed after statement error: {rollback_error:#}");
                }
                return Err(error);
            }
        }

        tx.commit().await.map_err(SinkError::Destination)
    }
}
