//! Line-oriented terminal front end for a reload run.
use super::view::RunView;
use crate::config::DecisionMode;
use crate::reload::{DecisionRequest, GateDecision, RunEvent, RunReport};
use crate::util::{strip_control_chars, truncate_to_width};
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

/// Account names are cut to this many columns in progress lines.
const NAME_WIDTH: usize = 32;

/// Drains run events, prints them, and answers operator questions.
pub struct Console<W: Write> {
    view: RunView,
    out: W,
    mode: DecisionMode,
    bell: bool,
    /// Operator answers, one per line. Stdin is attached on first prompt.
    answers: Option<mpsc::UnboundedReceiver<String>>,
    /// Set when the run stopped waiting before the operator answered.
    late_answer_pending: bool,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, mode: DecisionMode, max_log_lines: usize, bell: bool) -> Self {
        Self {
            view: RunView::new(max_log_lines),
            out,
            mode,
            bell,
            answers: None,
            late_answer_pending: false,
        }
    }

    /// Read prompt answers from `answers` instead of stdin.
    pub fn with_answers(mut self, answers: mpsc::UnboundedReceiver<String>) -> Self {
        self.answers = Some(answers);
        self
    }

    pub fn view(&self) -> &RunView {
        &self.view
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Process events until the worker is done. Returns the final report if
    /// the run completed.
    pub async fn present(&mut self, mut events: mpsc::Receiver<RunEvent>) -> io::Result<Option<RunReport>> {
        while let Some(event) = events.recv().await {
            self.view.apply(&event);
            match event {
                RunEvent::RunStarted { accounts } => {
                    writeln!(self.out, "Reloading {} account(s)", accounts.len())?;
                }
                RunEvent::StatusChanged {
                    account,
                    status,
                    index,
                    total,
                } => {
                    let name = strip_control_chars(&account.name);
                    writeln!(
                        self.out,
                        "[{index}/{total}] {:<width$} {status}",
                        truncate_to_width(&name, NAME_WIDTH),
                        width = NAME_WIDTH
                    )?;
                }
                RunEvent::LogAppended { account, message } => {
                    let name = strip_control_chars(&account.name);
                    writeln!(
                        self.out,
                        "    {}: {}",
                        truncate_to_width(&name, NAME_WIDTH),
                        message
                    )?;
                }
                RunEvent::DecisionRequested(request) => {
                    self.decide(request).await?;
                }
                RunEvent::RunCompleted(report) => {
                    self.print_report(&report)?;
                    if self.bell {
                        write!(self.out, "\x07")?;
                    }
                    self.out.flush()?;
                }
            }
        }
        Ok(self.view.report().cloned())
    }

    async fn decide(&mut self, mut request: DecisionRequest) -> io::Result<()> {
        let name = strip_control_chars(&request.account.name).into_owned();
        writeln!(
            self.out,
            "!! {name}: {}. Carry on with this account, or mark it bad and skip?",
            request.reason
        )?;

        let decision = match self.mode {
            DecisionMode::CarryOn => Some(GateDecision::CarryOn),
            DecisionMode::Skip => Some(GateDecision::MarkBadAndSkip),
            DecisionMode::Prompt => {
                write!(self.out, "[c]arry on / [s]kip (default skip): ")?;
                self.out.flush()?;

                let answers = self.answers.get_or_insert_with(stdin_lines);
                if std::mem::take(&mut self.late_answer_pending) {
                    // Whatever was typed for the abandoned question is stale
                    while answers.try_recv().is_ok() {}
                }

                tokio::select! {
                    line = answers.recv() => Some(match line {
                        Some(line) => parse_answer(&line),
                        None => GateDecision::MarkBadAndSkip,
                    }),
                    _ = request.abandoned() => None,
                }
            }
        };

        let Some(decision) = decision else {
            self.late_answer_pending = true;
            writeln!(self.out)?;
            writeln!(self.out, "   -> no answer in time, skipped")?;
            return Ok(());
        };

        writeln!(
            self.out,
            "   -> {}",
            match decision {
                GateDecision::CarryOn => "carrying on",
                GateDecision::MarkBadAndSkip => "marking bad and skipping",
            }
        )?;
        request.answer(decision);
        Ok(())
    }

    fn print_report(&mut self, report: &RunReport) -> io::Result<()> {
        writeln!(self.out, "All done.")?;
        if let Some(summary) = &report.summary {
            for line in summary.lines() {
                writeln!(self.out, "{line}")?;
            }
        }
        if !report.problematic.is_empty() {
            writeln!(self.out, "Accounts needing review:")?;
            for problem in &report.problematic {
                let reasons: Vec<&str> = problem.reasons.iter().collect();
                writeln!(
                    self.out,
                    "  {} [{}] ({}): {}",
                    strip_control_chars(&problem.account.name),
                    problem.level,
                    problem.account.kind,
                    reasons.join(" ")
                )?;
            }
        }
        Ok(())
    }
}

/// Forward stdin lines to the console until EOF or a read error.
///
/// Runs on a plain thread so a pending read never holds up runtime shutdown.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read decision from stdin");
                    break;
                }
            }
        }
    });
    rx
}

/// Anything but an explicit carry-on skips.
fn parse_answer(answer: &str) -> GateDecision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "c" | "carry" | "carry on" | "carry-on" | "continue" => GateDecision::CarryOn,
        _ => GateDecision::MarkBadAndSkip,
    }
}
