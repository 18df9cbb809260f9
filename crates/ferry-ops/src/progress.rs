//! Progress reporting types for transfer operations.

use std::path::PathBuf;

use ferry_core::TransferWarning;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::operation::OperationType;

/// Lifecycle status of an operation as seen by the progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Still running.
    Active,
    /// Finished; every item was processed or deliberately skipped.
    Done,
    /// Aborted by an unrecoverable failure.
    Error,
    /// Stopped by a Cancel decision or an external cancellation signal.
    Cancelled,
}

impl OperationStatus {
    /// Whether this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Snapshot of an operation's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    /// Number of steps the operation will take.
    pub total: usize,
    /// Number of steps taken so far. Never exceeds `total`.
    pub completed: usize,
    /// What the operation is doing right now.
    pub label: String,
    /// Current status.
    pub status: OperationStatus,
}

impl ProgressState {
    fn new(label: impl Into<String>) -> Self {
        Self {
            total: 0,
            completed: 0,
            label: label.into(),
            status: OperationStatus::Active,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.completed as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Result of a finished operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationComplete {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Terminal status.
    pub status: OperationStatus,
    /// Human-readable summary label.
    pub label: String,
    /// Number of items mutated.
    pub succeeded: usize,
    /// Number of items skipped by a decision.
    pub skipped: usize,
    /// Top-level sources that were fully moved (Move only).
    pub moved_sources: Vec<PathBuf>,
    /// Warnings collected during the run.
    pub warnings: Vec<TransferWarning>,
    /// The last progress snapshot.
    pub progress: ProgressState,
}

impl OperationComplete {
    /// Check if the operation finished without error or cancellation.
    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Done
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = self.operation_type.past_tense();
        match (self.skipped, self.warnings.len()) {
            (0, 0) => format!("{} {} items", action, self.succeeded),
            (skipped, 0) => format!("{} {} items, {} skipped", action, self.succeeded, skipped),
            (0, warnings) => format!("{} {} items, {} warnings", action, self.succeeded, warnings),
            (skipped, warnings) => format!(
                "{} {} items, {} skipped, {} warnings",
                action, self.succeeded, skipped, warnings
            ),
        }
    }
}

/// Event emitted by a running operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    /// Progress update.
    Progress(ProgressState),
    /// A non-fatal problem worth showing.
    Warning(TransferWarning),
    /// The operation finished. Always the last event.
    Complete(OperationComplete),
}

/// Append-only progress sink owned by one worker.
///
/// Every state change is published to the event channel; a closed channel is
/// ignored so an operation keeps running after its display goes away.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: mpsc::Sender<TransferEvent>,
    operation_type: OperationType,
    state: ProgressState,
    total_fixed: bool,
}

impl ProgressReporter {
    /// Create a reporter for an operation.
    pub fn new(tx: mpsc::Sender<TransferEvent>, operation_type: OperationType) -> Self {
        Self {
            tx,
            operation_type,
            state: ProgressState::new(format!("{operation_type}: preparing...")),
            total_fixed: false,
        }
    }

    /// The current snapshot.
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Fix the number of steps. Later calls are ignored.
    pub fn set_total(&mut self, total: usize) {
        if self.total_fixed {
            return;
        }
        self.total_fixed = true;
        self.state.total = total;
        self.state.completed = self.state.completed.min(total);
        self.publish();
    }

    /// Update the label without advancing.
    pub fn label(&mut self, label: &str) {
        self.state.label = format!("{}: {}", self.operation_type, label);
        self.publish();
    }

    /// Advance by one step and show `label`.
    pub fn step(&mut self, label: &str) {
        self.state.completed = (self.state.completed + 1).min(self.state.total);
        self.state.label = format!("{}: {}", self.operation_type, label);
        self.publish();
    }

    /// Emit a warning event.
    pub fn warn(&self, warning: TransferWarning) {
        let _ = self.tx.blocking_send(TransferEvent::Warning(warning));
    }

    /// Move to a terminal status and publish the final snapshot.
    ///
    /// `Done` fills the bar; other statuses keep the count reached so far.
    pub fn finish(&mut self, status: OperationStatus, label: impl Into<String>) -> ProgressState {
        if status == OperationStatus::Done {
            self.state.completed = self.state.total;
        }
        self.state.status = status;
        self.state.label = label.into();
        self.publish();
        self.state.clone()
    }

    /// Send the completion record. Consumes the reporter.
    pub fn complete(self, complete: OperationComplete) {
        let _ = self.tx.blocking_send(TransferEvent::Complete(complete));
    }

    fn publish(&self) {
        let _ = self
            .tx
            .blocking_send(TransferEvent::Progress(self.state.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<TransferEvent>) -> Vec<ProgressState> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let TransferEvent::Progress(p) = event {
                out.push(p);
            }
        }
        out
    }

    #[test]
    fn test_completed_never_exceeds_total() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut reporter = ProgressReporter::new(tx, OperationType::Copy);
        reporter.set_total(2);
        reporter.step("a");
        reporter.step("b");
        reporter.step("c");

        let states = drain(&mut rx);
        assert!(states.iter().all(|s| s.completed <= s.total));
        assert_eq!(states.last().unwrap().completed, 2);
    }

    #[test]
    fn test_total_is_fixed_once() {
        let (tx, _rx) = mpsc::channel(64);
        let mut reporter = ProgressReporter::new(tx, OperationType::Zip);
        reporter.set_total(5);
        reporter.set_total(50);
        assert_eq!(reporter.state().total, 5);
    }

    #[test]
    fn test_finish_done_fills_bar() {
        let (tx, _rx) = mpsc::channel(64);
        let mut reporter = ProgressReporter::new(tx, OperationType::Delete);
        reporter.set_total(3);
        reporter.step("x");
        let state = reporter.finish(OperationStatus::Done, "done");
        assert_eq!(state.completed, 3);
        assert_eq!(state.status, OperationStatus::Done);
    }

    #[test]
    fn test_finish_cancelled_keeps_count() {
        let (tx, _rx) = mpsc::channel(64);
        let mut reporter = ProgressReporter::new(tx, OperationType::Move);
        reporter.set_total(4);
        reporter.step("x");
        let state = reporter.finish(OperationStatus::Cancelled, "cancelled");
        assert_eq!(state.completed, 1);
        assert!(state.status.is_terminal());
    }

    #[test]
    fn test_summary() {
        let complete = OperationComplete {
            operation_type: OperationType::Copy,
            status: OperationStatus::Done,
            label: String::new(),
            succeeded: 4,
            skipped: 1,
            moved_sources: vec![],
            warnings: vec![],
            progress: ProgressState::new(""),
        };
        assert!(complete.is_success());
        assert_eq!(complete.summary(), "Copied 4 items, 1 skipped");
    }
}
