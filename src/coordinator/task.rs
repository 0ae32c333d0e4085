//! One unit of work: fetch a URL, transform it, store the payload.
//!
//! Timeouts and cancellation only interrupt the fetch step.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::db::ResultStore;
use crate::fetch::PageFetcher;
use crate::types::{FailureKind, TaskStatus};
use crate::{Error, Result};

/// Everything a worker needs to process one entry.
///
/// Cloned per task; all fields are shared handles.
#[derive(Clone)]
pub(super) struct TaskUnit {
    pub(super) fetcher: Arc<dyn PageFetcher>,
    pub(super) store: Arc<dyn ResultStore>,
    pub(super) timeout: Option<Duration>,
    pub(super) cancel_token: CancellationToken,
}

impl TaskUnit {
    /// Run the unit to completion, turning errors and panics into a status.
    pub(super) async fn run(self, url: String) -> TaskStatus {
        match AssertUnwindSafe(self.guarded(&url)).catch_unwind().await {
            Ok(Ok(record_id)) => TaskStatus::Stored { record_id },
            Ok(Err(e)) => TaskStatus::Failed {
                kind: e.failure_kind(),
                error: e.to_string(),
            },
            Err(panic) => TaskStatus::Failed {
                kind: FailureKind::Panicked,
                error: panic_message(panic.as_ref()),
            },
        }
    }

    /// Fetch bounded by the optional timeout and the cancel token, then store.
    ///
    /// Once the payload is handed to the store the task waits for its
    /// acknowledgment, so a committed row is always reported as stored.
    async fn guarded(&self, url: &str) -> Result<i64> {
        let payload = self.guarded_fetch(url).await?;
        self.store.store(&payload).await
    }

    async fn guarded_fetch(&self, url: &str) -> Result<String> {
        let fetch = async {
            let work = self.fetcher.fetch_and_transform(url);
            match self.timeout {
                Some(timeout) => tokio::time::timeout(timeout, work)
                    .await
                    .map_err(|_| Error::Timeout { timeout })?,
                None => work.await,
            }
        };

        tokio::select! {
            _ = self.cancel_token.cancelled() => Err(Error::Cancelled),
            result = fetch => result,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("task panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("task panicked: {s}")
    } else {
        "task panicked".to_string()
    }
}
