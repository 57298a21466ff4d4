//! Message sink handed to a reloader for the duration of one account.
use super::events::RunEvent;
use super::gate::{FailureGate, GateDecision};
use super::messages::{compact_message, issue_reason, GlobalCallFailure};
use super::summary::ReasonSet;
use super::tracker::OutcomeTracker;
use crate::account::Account;
use crate::cache::CacheError;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Receives every progress line a reloader produces for one account.
///
/// Each line is classified, logged to the run view, and checked for a
/// global call failure. After the operator chooses to skip, `emit` returns
/// [`CacheError::Skipped`] and ignores all further lines.
pub struct MessageSink {
    account: Arc<Account>,
    tracker: OutcomeTracker,
    issues: ReasonSet,
    gate: FailureGate,
    events: mpsc::Sender<RunEvent>,
    abort: Option<oneshot::Sender<()>>,
    gate_used: bool,
    skipped: bool,
    presentation_gone: bool,
}

/// State handed back to the worker once the reloader returned.
pub(crate) struct SinkParts {
    pub tracker: OutcomeTracker,
    pub issues: ReasonSet,
    pub skipped: bool,
    pub presentation_gone: bool,
}

impl MessageSink {
    pub(crate) fn new(
        account: Arc<Account>,
        tracker: OutcomeTracker,
        gate: FailureGate,
        events: mpsc::Sender<RunEvent>,
        abort: oneshot::Sender<()>,
        presentation_gone: bool,
    ) -> Self {
        Self {
            account,
            tracker,
            issues: ReasonSet::new(),
            gate,
            events,
            abort: Some(abort),
            gate_used: false,
            skipped: false,
            presentation_gone,
        }
    }

    /// True once the operator chose to skip this account.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Forward one progress line.
    pub async fn emit(&mut self, message: impl Into<String>) -> Result<(), CacheError> {
        if self.skipped {
            return Err(CacheError::Skipped);
        }

        let raw = message.into();
        let compact = compact_message(&raw);
        tracing::debug!(account = %self.account.name, message = %raw, "Reload progress");

        self.tracker.record_message(&self.account.id, &raw, &compact);
        if let Some(reason) = issue_reason(&raw) {
            self.issues.insert(reason);
        }
        self.log(compact).await;

        if self.gate_used {
            return Ok(());
        }
        let Some(failure) = GlobalCallFailure::parse(&raw) else {
            return Ok(());
        };
        self.gate_used = true;

        match self.gate.ask(&self.account, &failure.describe()).await {
            GateDecision::CarryOn => {
                self.log("Continuing after global call failure.").await;
                Ok(())
            }
            GateDecision::MarkBadAndSkip => {
                self.skipped = true;
                self.issues
                    .insert(format!("Marked bad by operator: {}.", failure.describe()));
                self.log("Skipped by operator.").await;
                if let Some(abort) = self.abort.take() {
                    let _ = abort.send(());
                }
                Err(CacheError::Skipped)
            }
        }
    }

    /// Record an issue that did not come from a progress line.
    pub(crate) fn add_issue(&mut self, reason: impl Into<String>) {
        self.issues.insert(reason);
    }

    pub(crate) fn mark_critical(&mut self) {
        self.tracker.mark_critical(&self.account.id);
    }

    pub(crate) async fn log(&mut self, message: impl Into<String>) {
        let event = RunEvent::LogAppended {
            account: Arc::clone(&self.account),
            message: message.into(),
        };
        if self.events.send(event).await.is_err() && !self.presentation_gone {
            self.presentation_gone = true;
            tracing::info!("Run view closed, continuing reload in background");
        }
    }

    pub(crate) fn into_parts(self) -> SinkParts {
        SinkParts {
            tracker: self.tracker,
            issues: self.issues,
            skipped: self.skipped,
            presentation_gone: self.presentation_gone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountKind;
    use pretty_assertions::assert_eq;

    fn sink(tx: mpsc::Sender<RunEvent>) -> (MessageSink, oneshot::Receiver<()>) {
        let (abort_tx, abort_rx) = oneshot::channel();
        let account = Arc::new(Account::new("acc", "Portal", AccountKind::StalkerPortal));
        let gate = FailureGate::new(tx.clone(), None);
        (
            MessageSink::new(account, OutcomeTracker::new(), gate, tx, abort_tx, false),
            abort_rx,
        )
    }

    #[tokio::test]
    async fn test_lines_are_logged_compacted_and_classified() {
        let (tx, mut rx) = mpsc::channel(16);
        let (mut sink, _abort) = sink(tx);

        sink.emit("Found Channels 120. Found 0 Orphaned channels.").await.unwrap();
        sink.emit("Handshake failed for: Portal").await.unwrap();
        sink.emit("Handshake failed for: Portal").await.unwrap();

        let mut logged = Vec::new();
        while let Ok(RunEvent::LogAppended { message, .. }) = rx.try_recv() {
            logged.push(message);
        }
        assert_eq!(
            logged,
            vec!["Live channels: 120", "Failed: handshake.", "Failed: handshake."]
        );

        let parts = sink.into_parts();
        assert_eq!(parts.tracker.fetched_channels("acc"), 120);
        assert!(parts.tracker.has_critical_failure("acc"));
        assert_eq!(parts.issues.as_slice(), &["Handshake failed.".to_string()]);
        assert!(!parts.skipped);
        assert!(!parts.presentation_gone);
    }

    #[tokio::test]
    async fn test_closed_view_is_noticed_and_lines_still_counted() {
        let (tx, rx) = mpsc::channel(16);
        drop(rx);
        let (mut sink, _abort) = sink(tx);

        sink.emit("Found Channels 8").await.unwrap();
        sink.emit("Error fetching channels for category 2: eof").await.unwrap();
        sink.emit("Found Channels 9").await.unwrap();

        let parts = sink.into_parts();
        assert!(parts.presentation_gone);
        assert_eq!(parts.tracker.fetched_channels("acc"), 9);
        assert_eq!(
            parts.issues.as_slice(),
            &["Some categories failed to load.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_skip_aborts_and_ignores_later_lines() {
        let (tx, mut rx) = mpsc::channel(16);
        let (mut sink, mut abort) = sink(tx);

        let responder = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Some(RunEvent::DecisionRequested(request)) => {
                        request.answer(GateDecision::MarkBadAndSkip);
                    }
                    Some(_) => {}
                    None => break,
                }
            }
        });

        let result = sink
            .emit("Global call failed: get_all_channels: timeout")
            .await;
        assert!(matches!(result, Err(CacheError::Skipped)));
        assert!(sink.is_skipped());
        assert!(abort.try_recv().is_ok());

        let later = sink.emit("Found Channels 10").await;
        assert!(matches!(later, Err(CacheError::Skipped)));

        let parts = sink.into_parts();
        assert_eq!(parts.tracker.fetched_channels("acc"), 0);
        assert!(parts.skipped);
        assert_eq!(
            parts.issues.as_slice(),
            &[
                "Global call get_all_channels failed.".to_string(),
                "Marked bad by operator: get_all_channels call failed (timeout).".to_string(),
            ]
        );
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_gate_activates_once_per_account() {
        let (tx, mut rx) = mpsc::channel(16);
        let (mut sink, _abort) = sink(tx);

        let responder = tokio::spawn(async move {
            let mut asked = 0;
            while let Some(event) = rx.recv().await {
                if let RunEvent::DecisionRequested(request) = event {
                    asked += 1;
                    request.answer(GateDecision::CarryOn);
                }
            }
            asked
        });

        sink.emit("Global call failed: get_all_channels").await.unwrap();
        sink.emit("Global call failed: get_categories (mode=VOD)").await.unwrap();
        let parts = sink.into_parts();
        assert_eq!(parts.issues.len(), 2);
        assert!(parts.tracker.has_critical_failure("acc"));

        assert_eq!(responder.await.unwrap(), 1);
    }
}
