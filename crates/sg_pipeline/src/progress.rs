//! Batch progress events.
//!
//! The orchestrator reports every state change of a batch through a
//! [`ProgressReporter`]. Events arrive strictly in order since tasks run
//! one after another.

use std::sync::Mutex;

use serde::Serialize;
use sg_core::Provider;

/// Where a batch is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Planning,
    /// `completed` of `total` tasks are done.
    Generating { completed: usize, total: usize },
    Done,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Done | BatchStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    StatusChanged { status: BatchStatus },
    TaskStarted { index: usize, total: usize, title: String },
    /// Task `index` (1-based) finished: "k of N complete".
    TaskCompleted { index: usize, total: usize, title: String, score: u8 },
    FellBack { from: Provider, to: Provider, reason: String },
    TaskFailed { index: usize, total: usize, title: String, error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: BatchEvent);
}

/// No-op reporter when progress is not observed.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: BatchEvent) {}
}

/// Human-friendly progress on stderr.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: BatchEvent) {
        match event {
            BatchEvent::StatusChanged { status } => eprintln!("batch  {:?}", status),
            BatchEvent::TaskStarted { index, total, title } => {
                eprintln!("batch  generating {} of {}  {}", index, total, title)
            }
            BatchEvent::TaskCompleted { index, total, title, score } => {
                eprintln!("batch  {} of {} complete  {} (score {})", index, total, title, score)
            }
            BatchEvent::FellBack { from, to, reason } => {
                eprintln!("batch  {} failed ({}), fell back to {}", from, reason, to)
            }
            BatchEvent::TaskFailed { index, total, title, error } => {
                eprintln!("batch  task {} of {} failed  {}: {}", index, total, title, error)
            }
        }
    }
}

/// Keeps events for inspection.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<BatchEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn statuses(&self) -> Vec<BatchStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BatchEvent::StatusChanged { status } => Some(status),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: BatchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let value = serde_json::to_value(BatchStatus::Generating { completed: 2, total: 7 }).unwrap();
        assert_eq!(value["state"], "GENERATING");
        assert_eq!(value["completed"], 2);
        assert!(BatchStatus::Failed.is_terminal());
        assert!(!BatchStatus::Planning.is_terminal());
    }

    #[test]
    fn test_recording_progress() {
        let progress = RecordingProgress::new();
        progress.report(BatchEvent::StatusChanged { status: BatchStatus::Planning });
        progress.report(BatchEvent::TaskStarted { index: 1, total: 1, title: "t".to_string() });
        progress.report(BatchEvent::StatusChanged { status: BatchStatus::Done });
        assert_eq!(progress.events().len(), 3);
        assert_eq!(progress.statuses(), vec![BatchStatus::Planning, BatchStatus::Done]);
    }
}
