//! Events sent from the run worker to the presentation side.
use super::aggregate::RunReport;
use super::gate::DecisionRequest;
use super::status::AccountRunStatus;
use crate::account::Account;
use std::sync::Arc;

/// Everything the presentation side learns about a run.
///
/// Events arrive in emission order. All events for one account are sent
/// before the next account starts.
#[derive(Debug)]
pub enum RunEvent {
    /// The run accepted its queue; every account starts out `Queued`.
    RunStarted { accounts: Vec<Arc<Account>> },
    StatusChanged {
        account: Arc<Account>,
        status: AccountRunStatus,
        /// 1-based queue position.
        index: usize,
        total: usize,
    },
    /// A compacted progress line from the account's reloader.
    LogAppended {
        account: Arc<Account>,
        message: String,
    },
    /// The worker is suspended until this request is answered or dropped.
    DecisionRequested(DecisionRequest),
    RunCompleted(RunReport),
}
