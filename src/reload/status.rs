//! Per-account status for the run view.
//!
//! Each account moves `Queued -> Running -> terminal` exactly once per run.
use super::summary::SummaryLevel;
use super::tracker::AccountFacts;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "UPPERCASE")]
pub enum AccountRunStatus {
    Queued,
    Running { current: usize, total: usize },
    Done,
    Yellow,
    Empty,
    Failed,
}

impl AccountRunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AccountRunStatus::Done
                | AccountRunStatus::Yellow
                | AccountRunStatus::Empty
                | AccountRunStatus::Failed
        )
    }

    pub fn can_transition_to(self, next: AccountRunStatus) -> bool {
        match (self, next) {
            (AccountRunStatus::Queued, AccountRunStatus::Running { .. }) => true,
            (AccountRunStatus::Running { .. }, next) => next.is_terminal(),
            _ => false,
        }
    }

    /// Severity of a terminal status as used by the run summary.
    pub fn level(self) -> Option<SummaryLevel> {
        match self {
            AccountRunStatus::Done => Some(SummaryLevel::Good),
            AccountRunStatus::Yellow => Some(SummaryLevel::Yellow),
            AccountRunStatus::Empty | AccountRunStatus::Failed => Some(SummaryLevel::Bad),
            AccountRunStatus::Queued | AccountRunStatus::Running { .. } => None,
        }
    }
}

impl fmt::Display for AccountRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRunStatus::Queued => f.write_str("QUEUED"),
            AccountRunStatus::Running { current, total } => {
                write!(f, "RUNNING {current}/{total}")
            }
            AccountRunStatus::Done => f.write_str("DONE"),
            AccountRunStatus::Yellow => f.write_str("YELLOW"),
            AccountRunStatus::Empty => f.write_str("EMPTY"),
            AccountRunStatus::Failed => f.write_str("FAILED"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid status transition {from} -> {to}")]
    Invalid {
        from: AccountRunStatus,
        to: AccountRunStatus,
    },
    #[error("No account at queue position {0}")]
    OutOfRange(usize),
}

/// Status of every account in the run queue, indexed by queue position.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    statuses: Vec<AccountRunStatus>,
}

impl StatusBoard {
    pub fn new(len: usize) -> Self {
        Self {
            statuses: vec![AccountRunStatus::Queued; len],
        }
    }

    pub fn get(&self, position: usize) -> Option<AccountRunStatus> {
        self.statuses.get(position).copied()
    }

    /// Move the account at `position` forward. Regressions are rejected.
    pub fn advance(
        &mut self,
        position: usize,
        next: AccountRunStatus,
    ) -> Result<(), TransitionError> {
        let slot = self
            .statuses
            .get_mut(position)
            .ok_or(TransitionError::OutOfRange(position))?;
        if !slot.can_transition_to(next) {
            return Err(TransitionError::Invalid {
                from: *slot,
                to: next,
            });
        }
        *slot = next;
        Ok(())
    }
}

/// Channels an account can serve after the reload: the fresh count, or the
/// previously cached count when that is higher.
pub fn available_channels(facts: AccountFacts, cached: usize) -> usize {
    facts.fetched_channels.max(cached)
}

/// Terminal status for an account once its reload returned.
///
/// A critical failure always downgrades the result, even when the channel
/// count looks healthy.
pub fn derive_terminal(facts: AccountFacts, cached: usize, level: SummaryLevel) -> AccountRunStatus {
    let available = available_channels(facts, cached);
    if facts.critical_failure {
        return if available > 0 {
            AccountRunStatus::Yellow
        } else {
            AccountRunStatus::Failed
        };
    }
    if available > 0 && level == SummaryLevel::Good {
        AccountRunStatus::Done
    } else if available > 0 {
        AccountRunStatus::Yellow
    } else {
        AccountRunStatus::Empty
    }
}
