//! End-of-run tally and the problematic-account hand-off.
use super::status::AccountRunStatus;
use super::summary::{ReasonSet, SummaryLevel, SummaryStatus};
use crate::account::Account;
use serde::Serialize;
use std::sync::Arc;

/// Result of one account's reload.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOutcome {
    pub account: Arc<Account>,
    pub status: AccountRunStatus,
    pub summary: SummaryStatus,
}

impl AccountOutcome {
    /// Severity used for tallies. Follows the terminal status so an operator
    /// skip counts as BAD even when cached channels exist.
    pub fn level(&self) -> SummaryLevel {
        self.status.level().unwrap_or(SummaryLevel::Bad)
    }
}

/// Aggregate counts for a multi-account run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub completed: usize,
    pub total: usize,
    pub good: usize,
    pub yellow: usize,
    pub bad: usize,
    pub yellow_accounts: Vec<String>,
    pub bad_accounts: Vec<String>,
    /// Channels across GOOD and YELLOW accounts.
    pub channels_loaded: usize,
}

impl RunSummary {
    /// Human-readable summary block for the run log.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Completed {}/{}", self.completed, self.total),
            format!("Good: {}", self.good),
            format!("Yellow: {}", self.yellow),
            format!("Bad: {}", self.bad),
            format!("Channels loaded: {}", self.channels_loaded),
        ];
        if !self.yellow_accounts.is_empty() {
            lines.push(format!("Yellow accounts: {}", self.yellow_accounts.join(", ")));
        }
        if !self.bad_accounts.is_empty() {
            lines.push(format!("Bad accounts: {}", self.bad_accounts.join(", ")));
        }
        lines
    }
}

/// Account handed to the external review/delete workflow.
#[derive(Debug, Clone, Serialize)]
pub struct ProblematicAccount {
    pub account: Arc<Account>,
    pub level: SummaryLevel,
    pub reasons: ReasonSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Absent when the run had exactly one account.
    pub summary: Option<RunSummary>,
    pub problematic: Vec<ProblematicAccount>,
    pub outcomes: Vec<AccountOutcome>,
}

/// Tally a finished queue. `total` is the queue length.
pub fn aggregate(outcomes: Vec<AccountOutcome>, total: usize) -> RunReport {
    let mut good = 0;
    let mut yellow = 0;
    let mut bad = 0;
    let mut yellow_accounts = Vec::new();
    let mut bad_accounts = Vec::new();
    let mut channels_loaded = 0usize;
    let mut problematic = Vec::new();

    for outcome in &outcomes {
        let level = outcome.level();
        match level {
            SummaryLevel::Good => good += 1,
            SummaryLevel::Yellow => {
                yellow += 1;
                yellow_accounts.push(outcome.account.name.clone());
            }
            SummaryLevel::Bad => {
                bad += 1;
                bad_accounts.push(outcome.account.name.clone());
            }
        }

        if level != SummaryLevel::Bad {
            channels_loaded = channels_loaded.saturating_add(outcome.summary.channels_loaded);
        }

        if level != SummaryLevel::Good {
            problematic.push(ProblematicAccount {
                account: Arc::clone(&outcome.account),
                level,
                reasons: outcome.summary.reasons.clone(),
            });
        }
    }

    let summary = (total != 1).then(|| RunSummary {
        completed: outcomes.len(),
        total,
        good,
        yellow,
        bad,
        yellow_accounts,
        bad_accounts,
        channels_loaded,
    });

    RunReport {
        summary,
        problematic,
        outcomes,
    }
}
