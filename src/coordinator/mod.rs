//! Batch coordinator: runs batches one after another, each on a fresh
//! worker pool with one task per URL.
//!
//! A batch's pool is a [`JoinSet`] holding exactly one task per entry. The
//! coordinator waits for every task of the batch before dropping the pool and
//! starting the next batch, so batches never overlap. Task failures are
//! recorded in the [`BatchReport`], logged, and broadcast as
//! [`Event::TaskFailed`]; they never abort sibling tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::FailurePolicy;
use crate::db::ResultStore;
use crate::fetch::PageFetcher;
use crate::types::{
    BatchReport, Event, FailureKind, HaltReason, RunReport, TaskOutcome, TaskStatus, UrlEntry,
};

mod task;

use task::TaskUnit;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Runs batches of fetch-and-store tasks
pub struct BatchCoordinator {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn ResultStore>,
    failure_policy: FailurePolicy,
    task_timeout: Option<Duration>,
    cancel_token: CancellationToken,
    event_tx: broadcast::Sender<Event>,
}

impl BatchCoordinator {
    /// Coordinator with the default policy: keep going on failures, no timeout
    pub fn new(fetcher: Arc<dyn PageFetcher>, store: Arc<dyn ResultStore>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            fetcher,
            store,
            failure_policy: FailurePolicy::default(),
            task_timeout: None,
            cancel_token: CancellationToken::new(),
            event_tx,
        }
    }

    /// Replace the fetcher
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Bound every task by `timeout` (None = wait indefinitely)
    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Token that cancels the run when triggered
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Process `batches` strictly in order.
    ///
    /// Returns once every batch has run, or earlier when the run is cancelled
    /// or the failure policy halts it.
    pub async fn run(&self, batches: Vec<Vec<UrlEntry>>) -> RunReport {
        let planned_batches = batches.len();
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(planned_batches);
        let mut halted = None;

        for (index, batch) in batches.into_iter().enumerate() {
            if self.cancel_token.is_cancelled() {
                halted = Some(HaltReason::Cancelled);
                break;
            }

            let report = self.run_batch(index, batch).await;
            let failed = report.failed();
            reports.push(report);

            if self.cancel_token.is_cancelled() {
                halted = Some(HaltReason::Cancelled);
                break;
            }
            if failed > 0
                && self.failure_policy == FailurePolicy::StopRun
                && index + 1 < planned_batches
            {
                halted = Some(HaltReason::FailurePolicy { batch: index });
                break;
            }
        }

        let report = RunReport {
            batches: reports,
            planned_batches,
            halted,
            started_at,
            finished_at: Utc::now(),
        };

        if let Some(reason) = &report.halted {
            tracing::warn!(
                reason = ?reason,
                completed_batches = report.batches.len(),
                planned_batches,
                "Run halted early"
            );
            self.event_tx
                .send(Event::RunHalted {
                    reason: reason.clone(),
                })
                .ok();
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            batches = report.batches.len(),
            "Run finished"
        );
        self.event_tx
            .send(Event::RunCompleted {
                succeeded: report.succeeded(),
                failed: report.failed(),
            })
            .ok();

        report
    }

    /// Run one batch on a fresh pool and wait for all of its tasks.
    pub async fn run_batch(&self, index: usize, batch: Vec<UrlEntry>) -> BatchReport {
        let size = batch.len();
        tracing::info!(batch = index, size, "Starting batch");
        self.event_tx
            .send(Event::BatchStarted { batch: index, size })
            .ok();

        let unit = TaskUnit {
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            timeout: self.task_timeout,
            cancel_token: self.cancel_token.child_token(),
        };

        let mut pool = JoinSet::new();
        for (position, entry) in batch.iter().enumerate() {
            let unit = unit.clone();
            let url = entry.url.clone();
            pool.spawn(async move { (position, unit.run(url).await) });
        }

        let mut statuses: Vec<Option<TaskStatus>> = vec![None; size];
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok((position, status)) => {
                    self.record(index, &batch[position], &status);
                    statuses[position] = Some(status);
                }
                Err(join_err) => {
                    if join_err.is_panic() {
                        tracing::error!(batch = index, error = ?join_err, "Worker task panicked");
                    } else {
                        tracing::error!(batch = index, error = ?join_err, "Worker task was aborted");
                    }
                }
            }
        }
        drop(pool);

        let outcomes: Vec<TaskOutcome> = batch
            .into_iter()
            .zip(statuses)
            .map(|(entry, status)| {
                let status = status.unwrap_or_else(|| {
                    let status = TaskStatus::Failed {
                        kind: FailureKind::Panicked,
                        error: "worker task did not complete".to_string(),
                    };
                    self.record(index, &entry, &status);
                    status
                });
                TaskOutcome { entry, status }
            })
            .collect();

        let report = BatchReport { index, outcomes };
        tracing::info!(
            batch = index,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch completed"
        );
        self.event_tx
            .send(Event::BatchCompleted {
                batch: index,
                succeeded: report.succeeded(),
                failed: report.failed(),
            })
            .ok();

        report
    }

    /// Log and broadcast one task's final status
    fn record(&self, batch: usize, entry: &UrlEntry, status: &TaskStatus) {
        match status {
            TaskStatus::Stored { record_id } => {
                tracing::debug!(
                    batch,
                    line = entry.line,
                    url = %entry.url,
                    record_id,
                    "Stored result"
                );
                self.event_tx
                    .send(Event::TaskStored {
                        batch,
                        entry: entry.clone(),
                        record_id: *record_id,
                    })
                    .ok();
            }
            TaskStatus::Failed { kind, error } => {
                tracing::warn!(
                    batch,
                    line = entry.line,
                    url = %entry.url,
                    kind = ?kind,
                    error = %error,
                    "Task failed"
                );
                self.event_tx
                    .send(Event::TaskFailed {
                        batch,
                        entry: entry.clone(),
                        kind: *kind,
                        error: error.clone(),
                    })
                    .ok();
            }
        }
    }
}
