//! Presentation-side state of a run, built only from [`RunEvent`]s.
use crate::account::Account;
use crate::reload::{AccountRunStatus, RunEvent, RunReport};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub account: Arc<Account>,
    pub status: AccountRunStatus,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub account: Option<String>,
    pub message: String,
}

/// Snapshot of a run as the operator sees it.
///
/// The view never talks back to the worker; closing it only drops what it
/// has accumulated.
#[derive(Debug)]
pub struct RunView {
    rows: Vec<AccountRow>,
    log: VecDeque<LogLine>,
    max_log_lines: usize,
    report: Option<RunReport>,
}

impl RunView {
    pub fn new(max_log_lines: usize) -> Self {
        Self {
            rows: Vec::new(),
            log: VecDeque::new(),
            max_log_lines: max_log_lines.max(1),
            report: None,
        }
    }

    pub fn apply(&mut self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { accounts } => {
                self.close();
                self.rows = accounts
                    .iter()
                    .map(|account| AccountRow {
                        account: Arc::clone(account),
                        status: AccountRunStatus::Queued,
                    })
                    .collect();
            }
            RunEvent::StatusChanged {
                account, status, ..
            } => {
                if let Some(row) = self.rows.iter_mut().find(|r| r.account.id == account.id) {
                    row.status = *status;
                }
            }
            RunEvent::LogAppended { account, message } => {
                self.push_log(Some(account.name.clone()), message.clone());
            }
            RunEvent::DecisionRequested(request) => {
                self.push_log(
                    Some(request.account.name.clone()),
                    format!("Waiting for decision: {}", request.reason),
                );
            }
            RunEvent::RunCompleted(report) => {
                self.push_log(None, "All done.".to_string());
                if let Some(summary) = &report.summary {
                    for line in summary.lines() {
                        self.push_log(None, line);
                    }
                }
                self.report = Some(report.clone());
            }
        }
    }

    fn push_log(&mut self, account: Option<String>, message: String) {
        if self.log.len() == self.max_log_lines {
            self.log.pop_front();
        }
        self.log.push_back(LogLine {
            at: Local::now(),
            account,
            message,
        });
    }

    /// Drop everything accumulated for the current run.
    pub fn close(&mut self) {
        self.rows.clear();
        self.log.clear();
        self.report = None;
    }

    pub fn rows(&self) -> &[AccountRow] {
        &self.rows
    }

    pub fn log(&self) -> impl Iterator<Item = &LogLine> {
        self.log.iter()
    }

    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    /// Accounts finished so far and queue length.
    pub fn progress(&self) -> (usize, usize) {
        let done = self.rows.iter().filter(|r| r.status.is_terminal()).count();
        (done, self.rows.len())
    }

    /// Plain-text log, one `[HH:MM:SS]`-stamped line per entry, for copying
    /// out of the view.
    pub fn log_text(&self) -> String {
        let mut text = String::new();
        for line in &self.log {
            let at = line.at.format("%H:%M:%S");
            match &line.account {
                Some(account) => text.push_str(&format!("[{at}] {account}: {}\n", line.message)),
                None => text.push_str(&format!("[{at}] {}\n", line.message)),
            }
        }
        text
    }
}
