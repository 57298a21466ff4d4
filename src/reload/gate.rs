//! Operator decision after a whole-source listing call fails.
//!
//! The worker sends a [`DecisionRequest`] and waits for exactly one answer.
//! Anything other than an explicit answer (closed event channel, dropped
//! request, elapsed timeout) resolves to [`GateDecision::MarkBadAndSkip`].
use super::events::RunEvent;
use crate::account::Account;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateDecision {
    /// Keep processing the account's reload.
    CarryOn,
    /// Abort the account's reload and mark it failed.
    MarkBadAndSkip,
}

/// Question put to the operator. Answering consumes the request.
#[derive(Debug)]
pub struct DecisionRequest {
    pub account: Arc<Account>,
    pub reason: String,
    reply: oneshot::Sender<GateDecision>,
}

impl DecisionRequest {
    /// Resolves once the run stopped waiting for this answer, e.g. after the
    /// decision timeout elapsed.
    pub async fn abandoned(&mut self) {
        self.reply.closed().await
    }

    pub fn answer(self, decision: GateDecision) {
        if self.reply.send(decision).is_err() {
            tracing::warn!(
                account = %self.account.name,
                "Decision arrived after the run stopped waiting"
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailureGate {
    events: mpsc::Sender<RunEvent>,
    timeout: Option<Duration>,
}

impl FailureGate {
    /// `timeout` of `None` waits for the operator indefinitely.
    pub fn new(events: mpsc::Sender<RunEvent>, timeout: Option<Duration>) -> Self {
        Self { events, timeout }
    }

    /// Ask whether to continue with `account` and wait for the answer.
    pub async fn ask(&self, account: &Arc<Account>, reason: &str) -> GateDecision {
        let (reply, answer) = oneshot::channel();
        let request = DecisionRequest {
            account: Arc::clone(account),
            reason: reason.to_string(),
            reply,
        };

        tracing::info!(account = %account.name, reason = %reason, "Waiting for operator decision");

        if self
            .events
            .send(RunEvent::DecisionRequested(request))
            .await
            .is_err()
        {
            tracing::warn!(account = %account.name, "Presentation unreachable, skipping account");
            return GateDecision::MarkBadAndSkip;
        }

        let received = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, answer).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::warn!(
                        account = %account.name,
                        timeout_secs = limit.as_secs(),
                        "No decision before timeout, skipping account"
                    );
                    return GateDecision::MarkBadAndSkip;
                }
            },
            None => answer.await,
        };

        match received {
            Ok(decision) => {
                tracing::info!(account = %account.name, decision = ?decision, "Operator decided");
                decision
            }
            Err(_) => {
                tracing::warn!(account = %account.name, "Decision request dropped, skipping account");
                GateDecision::MarkBadAndSkip
            }
        }
    }
}
