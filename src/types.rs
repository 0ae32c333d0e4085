//! Core types and events for batch-fetch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One work item: a line of the input file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntry {
    /// 1-based line number in the input file
    pub line: usize,
    /// Line text with terminator and surrounding whitespace removed
    pub url: String,
}

impl UrlEntry {
    /// Create a new entry
    pub fn new(line: usize, url: impl Into<String>) -> Self {
        Self {
            line,
            url: url.into(),
        }
    }
}

/// Classification of a failed task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection-level HTTP failure
    Network,
    /// Entry was not a valid absolute URL
    InvalidUrl,
    /// Write to the results table failed
    Storage,
    /// The transformation step returned an error
    Transform,
    /// Per-task timeout elapsed
    Timeout,
    /// Run was cancelled while the task was in flight
    Cancelled,
    /// The task panicked
    Panicked,
    /// Anything else
    Other,
}

/// Final state of one task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Payload fetched, transformed and persisted
    Stored {
        /// Identifier assigned by the store
        record_id: i64,
    },
    /// Task failed before its payload was persisted
    Failed {
        /// Failure classification
        kind: FailureKind,
        /// Error message
        error: String,
    },
}

/// Outcome of one fetch-and-store task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// The entry the task processed
    pub entry: UrlEntry,
    /// How it ended
    pub status: TaskStatus,
}

impl TaskOutcome {
    /// Whether the payload was persisted
    pub fn is_stored(&self) -> bool {
        matches!(self.status, TaskStatus::Stored { .. })
    }
}

/// Aggregated outcomes of one batch, in input order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// 0-based batch index
    pub index: usize,
    /// One outcome per entry of the batch
    pub outcomes: Vec<TaskOutcome>,
}

impl BatchReport {
    /// Number of tasks in the batch
    pub fn size(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of persisted payloads
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_stored()).count()
    }

    /// Number of failed tasks
    pub fn failed(&self) -> usize {
        self.size() - self.succeeded()
    }

    /// Iterator over failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_stored())
    }
}

/// Why a run stopped before processing every batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HaltReason {
    /// The cancellation token fired
    Cancelled,
    /// `FailurePolicy::StopRun` and the given batch had failures
    FailurePolicy {
        /// Index of the batch that triggered the halt
        batch: usize,
    },
}

/// Aggregated outcomes of a whole run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Reports of the batches that were processed, in order
    pub batches: Vec<BatchReport>,
    /// Total number of batches the run was given
    pub planned_batches: usize,
    /// Set when the run stopped early
    pub halted: Option<HaltReason>,
    /// When the first batch was started
    pub started_at: DateTime<Utc>,
    /// When the run returned
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Number of tasks that ran
    pub fn total(&self) -> usize {
        self.batches.iter().map(BatchReport::size).sum()
    }

    /// Number of persisted payloads
    pub fn succeeded(&self) -> usize {
        self.batches.iter().map(BatchReport::succeeded).sum()
    }

    /// Number of failed tasks
    pub fn failed(&self) -> usize {
        self.batches.iter().map(BatchReport::failed).sum()
    }

    /// Iterator over all failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.batches.iter().flat_map(BatchReport::failures)
    }

    /// Whether every planned batch ran
    pub fn is_complete(&self) -> bool {
        self.halted.is_none() && self.batches.len() == self.planned_batches
    }
}

/// Event emitted during a run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch's worker pool was created
    BatchStarted {
        /// Batch index
        batch: usize,
        /// Number of tasks in the batch
        size: usize,
    },

    /// A task persisted its payload
    TaskStored {
        /// Batch index
        batch: usize,
        /// The entry
        entry: UrlEntry,
        /// Identifier assigned by the store
        record_id: i64,
    },

    /// A task failed
    TaskFailed {
        /// Batch index
        batch: usize,
        /// The entry
        entry: UrlEntry,
        /// Failure classification
        kind: FailureKind,
        /// Error message
        error: String,
    },

    /// Every task of a batch finished and its pool was released
    BatchCompleted {
        /// Batch index
        batch: usize,
        /// Persisted payloads
        succeeded: usize,
        /// Failed tasks
        failed: usize,
    },

    /// The run stopped before its last batch
    RunHalted {
        /// Why
        reason: HaltReason,
    },

    /// The run returned
    RunCompleted {
        /// Persisted payloads across all batches
        succeeded: usize,
        /// Failed tasks across all batches
        failed: usize,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn stored(line: usize, id: i64) -> TaskOutcome {
        TaskOutcome {
            entry: UrlEntry::new(line, format!("http://example.com/{line}")),
            status: TaskStatus::Stored { record_id: id },
        }
    }

    fn failed(line: usize) -> TaskOutcome {
        TaskOutcome {
            entry: UrlEntry::new(line, format!("http://example.com/{line}")),
            status: TaskStatus::Failed {
                kind: FailureKind::Network,
                error: "connection refused".to_string(),
            },
        }
    }

    #[test]
    fn run_report_totals_sum_over_batches() {
        let now = Utc::now();
        let report = RunReport {
            batches: vec![
                BatchReport {
                    index: 0,
                    outcomes: vec![stored(1, 1), failed(2), stored(3, 2), stored(4, 3)],
                },
                BatchReport {
                    index: 1,
                    outcomes: vec![failed(5)],
                },
            ],
            planned_batches: 2,
            halted: None,
            started_at: now,
            finished_at: now,
        };

        assert_eq!(report.total(), 5);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 2);
        assert!(report.is_complete());

        let failed_lines: Vec<usize> = report.failures().map(|o| o.entry.line).collect();
        assert_eq!(failed_lines, vec![2, 5]);
    }

    #[test]
    fn halted_report_is_not_complete() {
        let now = Utc::now();
        let report = RunReport {
            batches: vec![],
            planned_batches: 3,
            halted: Some(HaltReason::Cancelled),
            started_at: now,
            finished_at: now,
        };
        assert!(!report.is_complete());
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let event = Event::TaskFailed {
            batch: 2,
            entry: UrlEntry::new(7, "http://example.com"),
            kind: FailureKind::InvalidUrl,
            error: "bad".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_failed");
        assert_eq!(json["kind"], "invalid_url");
        assert_eq!(json["entry"]["line"], 7);
    }
}
