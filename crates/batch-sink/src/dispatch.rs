//! Single-task dispatcher driving one connector.
//!
//! The dispatcher owns its connector, so upstream messages and idle-timeout
//! commits are serialized without locking. Callers talk to it through a
//! bounded command channel; every outcome (including idle commits) is
//! published on an unbounded outcome channel.

use std::time::Duration;

use anyhow::{anyhow, Result};
use sql_sink::{Destination, TableCreator};
use sync_core::{CommitOutcome, SourceMessage};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::connector::Connector;

enum Command {
    Message {
        message: SourceMessage,
        retry: bool,
        ack: oneshot::Sender<()>,
    },
    Flush {
        ack: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Cloneable handle for sending messages to a running dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    commands: mpsc::Sender<Command>,
}

impl DispatcherHandle {
    /// Deliver one message and wait until the connector has handled it.
    ///
    /// Waiting covers any flush the message triggers, so a slow destination
    /// throttles the caller.
    pub async fn send(&self, message: SourceMessage, retry: bool) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Message {
                message,
                retry,
                ack,
            })
            .await
            .map_err(|_| anyhow!("dispatcher has stopped"))?;
        done.await.map_err(|_| anyhow!("dispatcher dropped the message"))
    }

    /// Force a commit of everything pending and wait for it.
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Flush { ack })
            .await
            .map_err(|_| anyhow!("dispatcher has stopped"))?;
        done.await.map_err(|_| anyhow!("dispatcher dropped the flush"))
    }

    /// Ask the dispatcher to stop. Pending events are not flushed.
    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| anyhow!("dispatcher has stopped"))
    }
}

/// A running dispatcher.
pub struct Dispatcher<D> {
    /// Send side for upstream messages.
    pub handle: DispatcherHandle,
    /// Every outcome the connector produced, in order.
    pub outcomes: mpsc::UnboundedReceiver<CommitOutcome>,
    /// Resolves to the connector once the dispatcher stops.
    pub task: JoinHandle<Connector<D>>,
}

impl<D> Dispatcher<D>
where
    D: Destination + TableCreator + 'static,
{
    /// Spawn a dispatcher task owning `connector`.
    ///
    /// The idle timeout comes from the connector configuration; a zero
    /// timeout disables idle commits. `capacity` bounds the command channel.
    pub fn spawn(connector: Connector<D>, capacity: usize) -> Self {
        let (commands, receiver) = mpsc::channel(capacity.max(1));
        let (outcome_sender, outcomes) = mpsc::unbounded_channel();
        let idle_timeout = connector.config().idle_timeout;
        let task = tokio::spawn(run(connector, receiver, outcome_sender, idle_timeout));
        Self {
            handle: DispatcherHandle { commands },
            outcomes,
            task,
        }
    }
}

async fn run<D>(
    mut connector: Connector<D>,
    mut commands: mpsc::Receiver<Command>,
    outcomes: mpsc::UnboundedSender<CommitOutcome>,
    idle_timeout: Duration,
) -> Connector<D>
where
    D: Destination + TableCreator,
{
    let publish = |outcome: Option<CommitOutcome>| {
        if let Some(outcome) = outcome {
            if outcomes.send(outcome).is_err() {
                tracing::warn!("Outcome receiver dropped; discarding commit outcome");
            }
        }
    };

    let mut deadline: Option<Instant> = None;
    loop {
        let idle = deadline.unwrap_or_else(Instant::now);
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Message { message, retry, ack }) => {
                    let starts_idle_window = matches!(message, SourceMessage::Row(_));
                    publish(connector.handle(message, retry).await);
                    if connector.pending() == 0 || idle_timeout.is_zero() {
                        deadline = None;
                    } else if starts_idle_window || deadline.is_none() {
                        deadline = Some(Instant::now() + idle_timeout);
                    }
                    let _ = ack.send(());
                }
                Some(Command::Flush { ack }) => {
                    publish(connector.commit(false).await);
                    deadline = None;
                    let _ = ack.send(());
                }
                Some(Command::Shutdown) | None => break,
            },
            _ = tokio::time::sleep_until(idle), if deadline.is_some() => {
                publish(connector.timeout_commit().await);
                deadline = None;
            }
        }
    }

    tracing::debug!(
        "Dispatcher stopped with {} pending event(s)",
        connector.pending()
    );
    connector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;
    use sql_sink::MemoryDestination;
    use sync_core::{row, ChangeEvent};

    fn row_message(id: i64) -> SourceMessage {
        SourceMessage::Row(ChangeEvent::insert("db", "t", row! { "id" => id }))
    }

    fn spawn(batch_size: usize, idle_timeout: Duration) -> (Dispatcher<MemoryDestination>, MemoryDestination) {
        let destination = MemoryDestination::default();
        let config = ConnectorConfig {
            batch_size,
            idle_timeout,
            ..ConnectorConfig::default()
        };
        let connector = Connector::new(config, destination.clone());
        (Dispatcher::spawn(connector, 8), destination)
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_commit_fires() {
        let (mut dispatcher, destination) = spawn(100, Duration::from_secs(5));
        dispatcher.handle.send(row_message(1), false).await.unwrap();
        assert!(dispatcher.outcomes.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(6)).await;
        let outcome = dispatcher.outcomes.recv().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(destination.committed_statements().len(), 1);

        dispatcher.handle.shutdown().await.unwrap();
        let connector = dispatcher.task.await.unwrap();
        assert_eq!(connector.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_rows_push_back_idle_deadline() {
        let (mut dispatcher, destination) = spawn(100, Duration::from_secs(5));
        dispatcher.handle.send(row_message(1), false).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        dispatcher.handle.send(row_message(2), false).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(destination.transactions().is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        dispatcher.outcomes.recv().await.unwrap();
        assert_eq!(destination.committed_statements().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_idle_timeout_disables_idle_commit() {
        let (dispatcher, destination) = spawn(100, Duration::ZERO);
        dispatcher.handle.send(row_message(1), false).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(destination.transactions().is_empty());

        dispatcher.handle.flush().await.unwrap();
        assert_eq!(destination.committed_statements().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_outcomes_are_published() {
        let (mut dispatcher, _destination) = spawn(2, Duration::from_secs(60));
        dispatcher.handle.send(row_message(1), false).await.unwrap();
        dispatcher.handle.send(row_message(2), false).await.unwrap();
        let outcome = dispatcher.outcomes.recv().await.unwrap();
        assert!(outcome.is_success());

        dispatcher.handle.shutdown().await.unwrap();
        dispatcher.task.await.unwrap();
        assert!(dispatcher.handle.send(row_message(3), false).await.is_err());
    }
}
