//! Sequential reload of a queue of accounts.
//!
//! One worker task walks the queue in order. For each account it emits
//! `Running`, lets the cache service reload it through a [`MessageSink`],
//! derives the terminal status, and emits it before moving on. A failing or
//! panicking reload only ever affects its own account.
use super::aggregate::{aggregate, AccountOutcome, RunReport};
use super::events::RunEvent;
use super::gate::FailureGate;
use super::sink::MessageSink;
use super::status::{available_channels, derive_terminal, AccountRunStatus, StatusBoard};
use super::summary::classify;
use super::tracker::OutcomeTracker;
use crate::account::Account;
use crate::cache::{CacheError, CacheService};
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("No accounts selected for reload")]
    EmptyQueue,
    #[error("Reload worker stopped unexpectedly: {0}")]
    WorkerFailed(String),
}

/// Tunables for a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// How long the failure gate waits for the operator. `None` waits forever.
    pub decision_timeout: Option<Duration>,
    /// Capacity of the event channel to the presentation side.
    pub event_buffer: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            decision_timeout: None,
            event_buffer: 64,
        }
    }
}

/// Ordered, duplicate-free accounts selected for one run.
#[derive(Debug, Clone, Default)]
pub struct RunQueue {
    accounts: Vec<Arc<Account>>,
}

impl RunQueue {
    /// Build a queue, keeping the first occurrence of each account id.
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        let mut seen = HashSet::new();
        let accounts = accounts
            .into_iter()
            .filter(|a| seen.insert(a.id.clone()))
            .map(Arc::new)
            .collect();
        Self { accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> &[Arc<Account>] {
        &self.accounts
    }
}

/// Handle to a run in progress.
pub struct RunHandle {
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Wait for the worker and return the final report.
    pub async fn join(self) -> Result<RunReport, RunError> {
        self.task
            .await
            .map_err(|e| RunError::WorkerFailed(e.to_string()))
    }
}

/// Start reloading `queue` in the background.
///
/// Returns immediately. Events for the run arrive on the returned receiver;
/// dropping the receiver does not stop the worker.
pub fn start(
    queue: RunQueue,
    cache: Arc<dyn CacheService>,
    options: RunOptions,
) -> Result<(RunHandle, mpsc::Receiver<RunEvent>), RunError> {
    if queue.is_empty() {
        return Err(RunError::EmptyQueue);
    }

    let (events, events_rx) = mpsc::channel(options.event_buffer.max(1));
    let worker = Worker {
        cache,
        gate: FailureGate::new(events.clone(), options.decision_timeout),
        events,
        tracker: OutcomeTracker::new(),
        board: StatusBoard::new(queue.len()),
        presentation_gone: false,
    };

    tracing::info!(accounts = queue.len(), "Starting cache reload run");
    let task = tokio::spawn(worker.run(queue));
    Ok((RunHandle { task }, events_rx))
}

/// Why an account's reload did not complete normally.
enum AccountFailure {
    Skipped,
    Cache(CacheError),
    Panicked(String),
}

struct Worker {
    cache: Arc<dyn CacheService>,
    gate: FailureGate,
    events: mpsc::Sender<RunEvent>,
    tracker: OutcomeTracker,
    board: StatusBoard,
    presentation_gone: bool,
}

impl Worker {
    async fn run(mut self, queue: RunQueue) -> RunReport {
        let total = queue.len();
        self.tracker.clear();
        self.send(RunEvent::RunStarted {
            accounts: queue.accounts().to_vec(),
        })
        .await;

        let mut outcomes = Vec::with_capacity(total);
        for (position, account) in queue.accounts().iter().enumerate() {
            let index = position + 1;
            self.set_status(position, account, AccountRunStatus::Running { current: index, total }, total)
                .await;

            let outcome = self.reload_account(account).await;

            self.set_status(position, account, outcome.status, total).await;
            outcomes.push(outcome);
        }

        let report = aggregate(outcomes, total);
        match &report.summary {
            Some(summary) => tracing::info!(
                completed = summary.completed,
                total = summary.total,
                good = summary.good,
                yellow = summary.yellow,
                bad = summary.bad,
                channels = summary.channels_loaded,
                "Cache reload run finished"
            ),
            None => tracing::info!("Cache reload run finished"),
        }
        self.send(RunEvent::RunCompleted(report.clone())).await;
        report
    }

    async fn reload_account(&mut self, account: &Arc<Account>) -> AccountOutcome {
        let (abort_tx, abort_rx) = oneshot::channel();
        let mut sink = MessageSink::new(
            Arc::clone(account),
            std::mem::take(&mut self.tracker),
            self.gate.clone(),
            self.events.clone(),
            abort_tx,
            self.presentation_gone,
        );

        // `None` means the operator aborted the call mid-flight
        let returned = {
            let reload = catch_task_panic(self.cache.reload_cache(account, &mut sink));
            tokio::select! {
                biased;
                _ = abort_rx => None,
                result = reload => Some(result),
            }
        };

        let failure = if sink.is_skipped() {
            Some(AccountFailure::Skipped)
        } else {
            match returned {
                None => Some(AccountFailure::Skipped),
                Some(Ok(Ok(()))) => None,
                Some(Ok(Err(e))) => Some(AccountFailure::Cache(e)),
                Some(Err(panic)) => Some(AccountFailure::Panicked(panic)),
            }
        };

        match failure {
            None => {}
            Some(AccountFailure::Skipped) => {
                tracing::info!(account = %account.name, "Account skipped by operator");
                sink.mark_critical();
            }
            Some(AccountFailure::Cache(e)) => {
                tracing::warn!(account = %account.name, error = %e, "Cache reload failed");
                sink.add_issue(format!("Reload error: {e}"));
                sink.mark_critical();
                sink.log(format!("Error reloading cache for {}: {}", account.name, e))
                    .await;
            }
            Some(AccountFailure::Panicked(panic)) => {
                tracing::error!(account = %account.name, error = %panic, "Cache reload panicked");
                sink.add_issue(format!("Reload error: {panic}"));
                sink.mark_critical();
                sink.log(format!("Error reloading cache for {}: {}", account.name, panic))
                    .await;
            }
        }

        let cached = self.cached_count(account).await;
        let parts = sink.into_parts();
        self.tracker = parts.tracker;
        self.presentation_gone = parts.presentation_gone;

        let facts = self.tracker.facts(&account.id);
        let available = available_channels(facts, cached);
        let summary = classify(available, facts.critical_failure, &parts.issues);
        let status = if parts.skipped {
            AccountRunStatus::Failed
        } else {
            derive_terminal(facts, cached, summary.level)
        };

        if available == 0 {
            self.log(account, format!("Warning: No channels found for {}", account.name))
                .await;
        }

        tracing::debug!(
            account = %account.name,
            fetched = facts.fetched_channels,
            cached = cached,
            critical = facts.critical_failure,
            level = %summary.level,
            "Account reload classified"
        );

        AccountOutcome {
            account: Arc::clone(account),
            status,
            summary,
        }
    }

    async fn cached_count(&self, account: &Account) -> usize {
        match catch_task_panic(self.cache.cached_channel_count(&account.id)).await {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                tracing::warn!(account = %account.name, error = %e, "Failed to read cached channel count");
                0
            }
            Err(panic) => {
                tracing::error!(account = %account.name, error = %panic, "Cached channel count panicked");
                0
            }
        }
    }

    async fn set_status(
        &mut self,
        position: usize,
        account: &Arc<Account>,
        status: AccountRunStatus,
        total: usize,
    ) {
        if let Err(e) = self.board.advance(position, status) {
            tracing::error!(account = %account.name, error = %e, "Refusing status change");
            return;
        }
        tracing::info!(account = %account.name, index = position + 1, total = total, status = %status, "Account status");
        self.send(RunEvent::StatusChanged {
            account: Arc::clone(account),
            status,
            index: position + 1,
            total,
        })
        .await;
    }

    async fn log(&mut self, account: &Arc<Account>, message: String) {
        self.send(RunEvent::LogAppended {
            account: Arc::clone(account),
            message,
        })
        .await;
    }

    async fn send(&mut self, event: RunEvent) {
        if self.events.send(event).await.is_err() && !self.presentation_gone {
            // Keep working: the run view may be closed while the queue finishes
            self.presentation_gone = true;
            tracing::info!("Run view closed, continuing reload in background");
        }
    }
}

/// Run a future, converting a panic into `Err` with the panic message.
async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}
