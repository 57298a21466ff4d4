//! Bulk cache reload orchestration.
//!
//! Reloads the cached channel listing of a queue of accounts, one account
//! at a time, and triages each result:
//!
//! - [`messages`] - recognition of reloader progress lines
//! - [`tracker`] - per-account channel counts and sticky critical failures
//! - [`summary`] - GOOD / YELLOW / BAD verdict with reasons
//! - [`status`] - per-account status state machine
//! - [`gate`] - operator decision after a global call failure
//! - [`controller`] - the sequential run worker
//! - [`aggregate`] - end-of-run tally and problematic accounts
//!
//! # Example
//!
//! ```ignore
//! let queue = RunQueue::new(accounts);
//! let (handle, mut events) = start(queue, cache, RunOptions::default())?;
//! while let Some(event) = events.recv().await {
//!     // render status/log, answer DecisionRequested
//! }
//! let report = handle.join().await?;
//! ```

pub mod aggregate;
pub mod controller;
pub mod events;
pub mod gate;
pub mod messages;
mod sink;
pub mod status;
pub mod summary;
pub mod tracker;

pub use aggregate::{AccountOutcome, ProblematicAccount, RunReport, RunSummary};
pub use controller::{start, RunError, RunHandle, RunOptions, RunQueue};
pub use events::RunEvent;
pub use gate::{DecisionRequest, GateDecision};
pub use sink::MessageSink;
pub use status::AccountRunStatus;
pub use summary::{ReasonSet, SummaryLevel, SummaryStatus};
pub use tracker::OutcomeTracker;
