//! Replay of captured source messages.
//!
//! Reads a JSONL stream with one `SourceMessage` per line, feeds it through a
//! dispatcher and records every commit outcome with the position tracker.
//! Messages at or before the stored checkpoint are skipped, so rerunning a
//! replay resumes where the previous run stopped. Replay stops reading at
//! the first failed outcome.

use anyhow::{Context, Result};
use batch_sink::{Connector, Dispatcher};
use checkpoint::PositionTracker;
use sql_sink::{Destination, TableCreator};
use sync_core::{CommitOutcome, ReplicationPosition, SourceMessage};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

/// Totals for one replay run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplaySummary {
    /// Messages delivered to the connector.
    pub messages: usize,
    /// Messages skipped because the checkpoint already covers them.
    pub already_applied: usize,
    /// Flush and DDL outcomes received.
    pub outcomes: usize,
    /// Outcomes that reported a failure.
    pub failures: usize,
    /// Checkpoint position after the run.
    pub checkpoint: Option<ReplicationPosition>,
}

impl std::fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} message(s) delivered, {} already applied, {} outcome(s), {} failure(s), checkpoint {}",
            self.messages,
            self.already_applied,
            self.outcomes,
            self.failures,
            self.checkpoint
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

/// Open `-` as stdin, anything else as a file path.
pub async fn open_input(input: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open replay input '{input}'"))?;
    Ok(Box::new(file))
}

/// Replay `input` through a dispatcher owning `connector`.
///
/// Returns the run summary and the connector, which the caller should close.
pub async fn replay<D, R>(
    input: R,
    connector: Connector<D>,
    tracker: &mut PositionTracker,
    channel_capacity: usize,
) -> Result<(ReplaySummary, Connector<D>)>
where
    D: Destination + TableCreator + 'static,
    R: AsyncRead + Unpin,
{
    let Dispatcher {
        handle,
        mut outcomes,
        task,
    } = Dispatcher::spawn(connector, channel_capacity);

    let mut summary = ReplaySummary::default();
    let mut lines = LinesStream::new(BufReader::new(input).lines());
    let mut line_number = 0usize;

    while let Some(line) = lines.next().await {
        line_number += 1;
        let line = line.with_context(|| format!("Failed to read line {line_number}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let message: SourceMessage = serde_json::from_str(&line)
            .with_context(|| format!("Invalid source message on line {line_number}"))?;
        if message.position().is_some_and(|p| tracker.is_applied(p)) {
            summary.already_applied += 1;
            continue;
        }

        handle.send(message, false).await?;
        summary.messages += 1;

        while let Ok(outcome) = outcomes.try_recv() {
            record(outcome, tracker, &mut summary).await?;
        }
        if summary.failures > 0 {
            tracing::warn!("Stopping replay at line {line_number} after a failed commit");
            break;
        }
    }

    if summary.failures == 0 {
        handle.flush().await?;
    }
    handle.shutdown().await?;
    let connector = task.await.context("Dispatcher task panicked")?;
    while let Some(outcome) = outcomes.recv().await {
        record(outcome, tracker, &mut summary).await?;
    }

    summary.checkpoint = tracker.committed().cloned();
    Ok((summary, connector))
}

async fn record(
    outcome: CommitOutcome,
    tracker: &mut PositionTracker,
    summary: &mut ReplaySummary,
) -> Result<()> {
    summary.outcomes += 1;
    if !outcome.is_success() {
        summary.failures += 1;
        tracing::error!("Commit failed: {outcome}");
    }
    tracker.observe(&outcome).await?;
    Ok(())
}
