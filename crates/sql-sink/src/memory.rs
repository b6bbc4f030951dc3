//! In-memory destination.
//!
//! Records every transaction, forwarded statement and auto-created table.
//! Used by tests to assert on what reached the destination, and by the CLI's
//! dry-run mode to log statements instead of executing them.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use sql_types::{SqlDialect, TableRef, ToDdl};
use sync_core::{DestinationValue, Row};

use crate::traits::{Destination, DestinationTx, TableCreator};

/// One statement executed inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Vec<DestinationValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// One transaction as seen by the destination.
#[derive(Debug, Clone)]
pub struct RecordedTx {
    pub statements: Vec<RecordedStatement>,
    pub state: TxState,
}

#[derive(Debug, Default)]
struct MemoryState {
    transactions: Vec<RecordedTx>,
    executed: Vec<String>,
    created_tables: Vec<String>,
    fail_on: Vec<String>,
    fail_commits: bool,
    unreachable: bool,
    closed: bool,
}

impl MemoryState {
    fn check_injected(&self, sql: &str) -> Result<()> {
        match self.fail_on.iter().find(|pattern| sql.contains(pattern.as_str())) {
            Some(pattern) => Err(anyhow!("injected failure (matched '{pattern}') executing: {sql}")),
            None => Ok(()),
        }
    }
}

/// A destination that keeps everything in memory.
///
/// Clones share state, so a test can hand one clone to the connector and
/// inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    dialect: SqlDialect,
    log_statements: bool,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDestination {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Log every statement at info level (dry-run mode).
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Make any statement containing `pattern` fail.
    pub fn fail_on(&self, pattern: impl Into<String>) {
        self.state().fail_on.push(pattern.into());
    }

    /// Make every commit fail.
    pub fn fail_commits(&self, enabled: bool) {
        self.state().fail_commits = enabled;
    }

    /// Make `begin` and `ping` fail.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.fail_on.clear();
        state.fail_commits = false;
        state.unreachable = false;
    }

    pub fn transactions(&self) -> Vec<RecordedTx> {
        self.state().transactions.clone()
    }

    /// Statements of committed transactions, in commit order.
    pub fn committed_statements(&self) -> Vec<RecordedStatement> {
        self.state()
            .transactions
            .iter()
            .filter(|tx| tx.state == TxState::Committed)
            .flat_map(|tx| tx.statements.iter().cloned())
            .collect()
    }

    /// Statements forwarded through `Destination::execute`.
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// DDL issued by `TableCreator::ensure_table`.
    pub fn created_tables(&self) -> Vec<String> {
        self.state().created_tables.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl Destination for MemoryDestination {
    async fn begin(&self) -> Result<Box<dyn DestinationTx>> {
        let mut state = self.state();
        if state.unreachable {
            return Err(anyhow!("memory destination is unreachable"));
        }
        state.transactions.push(RecordedTx {
            statements: Vec::new(),
            state: TxState::Open,
        });
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            index: state.transactions.len() - 1,
            log_statements: self.log_statements,
        }))
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.state();
        state.check_injected(sql)?;
        if self.log_statements {
            tracing::info!("[dry-run] execute: {sql}");
        }
        state.executed.push(sql.to_string());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if self.state().unreachable {
            return Err(anyhow!("memory destination is unreachable"));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableCreator for MemoryDestination {
    async fn ensure_table(
        &self,
        table: &TableRef,
        sample: &Row,
        primary_keys: &[String],
    ) -> Result<()> {
        let ddl = self
            .dialect
            .create_table_if_not_exists(table, sample, primary_keys);
        let mut state = self.state();
        state.check_injected(&ddl)?;
        if self.log_statements {
            tracing::info!("[dry-run] ensure table: {ddl}");
        }
        state.created_tables.push(ddl);
        Ok(())
    }
}

struct MemoryTx {
    state: Arc<Mutex<MemoryState>>,
    index: usize,
    log_statements: bool,
}

impl MemoryTx {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish(&self, outcome: TxState) {
        if let Some(tx) = self.state().transactions.get_mut(self.index) {
            tx.state = outcome;
        }
    }
}

#[async_trait::async_trait]
impl DestinationTx for MemoryTx {
    async fn exec(&mut self, sql: &str, params: &[DestinationValue]) -> Result<u64> {
        let log_statements = self.log_statements;
        let index = self.index;
        let mut state = self.state();
        state.check_injected(sql)?;
        if log_statements {
            tracing::info!("[dry-run] tx {index}: {sql} {params:?}");
        }
        if let Some(tx) = state.transactions.get_mut(index) {
            tx.statements.push(RecordedStatement {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        }
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.state().fail_commits {
            self.finish(TxState::RolledBack);
            return Err(anyhow!("injected commit failure"));
        }
        self.finish(TxState::Committed);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.finish(TxState::RolledBack);
        Ok(())
    }
}
