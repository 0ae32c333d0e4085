//! Batch job: wires the line source, batcher and coordinator together.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::batching::batch;
use crate::config::{BlankLinePolicy, JobConfig, Parallelism};
use crate::coordinator::BatchCoordinator;
use crate::db::ResultStore;
use crate::fetch::{HttpFetcher, PageFetcher, transform};
use crate::source::read_urls;
use crate::types::{Event, RunReport};

/// A configured batch job, ready to run over an input file
pub struct BatchJob {
    parallelism: Parallelism,
    blank_lines: BlankLinePolicy,
    coordinator: BatchCoordinator,
}

impl BatchJob {
    /// Job that fetches over HTTP and persists into `store`
    pub fn new(parallelism: Parallelism, store: Arc<dyn ResultStore>, config: &JobConfig) -> Self {
        let fetcher = Arc::new(HttpFetcher::new(transform::from_config(&config.transform)));
        let coordinator = BatchCoordinator::new(fetcher, store)
            .with_failure_policy(config.failure_policy)
            .with_task_timeout(config.task_timeout);

        Self {
            parallelism,
            blank_lines: config.blank_lines,
            coordinator,
        }
    }

    /// Replace the HTTP fetcher, e.g. with a preconfigured client or a test stub
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.coordinator = self.coordinator.with_fetcher(fetcher);
        self
    }

    /// Cancel the job through `token`
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.coordinator = self.coordinator.with_cancel_token(token);
        self
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.coordinator.subscribe()
    }

    /// Read `input`, split it into batches and process them in order
    pub async fn run(&self, input: &Path) -> Result<RunReport> {
        let entries = read_urls(input, self.blank_lines).await?;
        let entry_count = entries.len();
        let batches = batch(entries, self.parallelism.get());

        tracing::info!(
            path = %input.display(),
            entries = entry_count,
            batches = batches.len(),
            parallelism = self.parallelism.get(),
            "Starting batch job"
        );

        Ok(self.coordinator.run(batches).await)
    }
}

/// Run a batch job over `input` with an HTTP fetcher built from `config`.
///
/// `store` must already have its schema in place (see
/// [`Database::connect`](crate::db::Database::connect)).
pub async fn run_batch_job(
    input: &Path,
    parallelism: Parallelism,
    store: Arc<dyn ResultStore>,
    config: &JobConfig,
) -> Result<RunReport> {
    BatchJob::new(parallelism, store, config).run(input).await
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::types::{FailureKind, HaltReason, TaskStatus};
    use crate::{Error, config::FailurePolicy};
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    /// Answers from a fixed table; unknown URLs fail as unreachable
    #[derive(Default)]
    struct TableFetcher {
        pages: Vec<(String, String)>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for TableFetcher {
        async fn fetch_and_transform(&self, url: &str) -> Result<String> {
            self.seen.lock().unwrap().push(url.to_string());
            self.pages
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, body)| body.clone())
                .ok_or_else(|| Error::Transform(format!("no page for {url}")))
        }
    }

    fn url_file(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    async fn sqlite_store() -> (Arc<Database>, NamedTempFile) {
        let db_file = NamedTempFile::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", db_file.path().display());
        let db = Database::connect(&url, 4).await.unwrap();
        (Arc::new(db), db_file)
    }

    #[tokio::test]
    async fn injected_fetcher_feeds_the_store() {
        let (db, _db_file) = sqlite_store().await;
        let fetcher = Arc::new(TableFetcher {
            pages: (1..=6)
                .map(|i| (format!("http://h{i}.test/"), format!("page {i}")))
                .collect(),
            ..TableFetcher::default()
        });
        let lines: Vec<String> = (1..=6).map(|i| format!("http://h{i}.test/")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let input = url_file(&refs);

        let report = BatchJob::new(Parallelism::new(4).unwrap(), db.clone(), &JobConfig::default())
            .with_fetcher(fetcher.clone())
            .run(input.path())
            .await
            .unwrap();

        assert_eq!(report.batches.len(), 2);
        assert_eq!(report.succeeded(), 6);
        assert_eq!(fetcher.seen.lock().unwrap().len(), 6);

        let texts: Vec<String> = db
            .list_results()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts.len(), 6);
        assert!(texts.contains(&"page 6".to_string()));
    }

    #[tokio::test]
    async fn stop_run_policy_from_config_halts_the_job() {
        let (db, _db_file) = sqlite_store().await;
        let fetcher = Arc::new(TableFetcher {
            pages: (2..=8)
                .map(|i| (format!("http://h{i}.test/"), format!("page {i}")))
                .collect(),
            ..TableFetcher::default()
        });
        let lines: Vec<String> = (1..=8).map(|i| format!("http://h{i}.test/")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let input = url_file(&refs);
        let config = JobConfig {
            failure_policy: FailurePolicy::StopRun,
            ..JobConfig::default()
        };

        let report = BatchJob::new(Parallelism::new(4).unwrap(), db.clone(), &config)
            .with_fetcher(fetcher)
            .run(input.path())
            .await
            .unwrap();

        assert_eq!(report.halted, Some(HaltReason::FailurePolicy { batch: 0 }));
        assert_eq!(db.count_results().await.unwrap(), 3);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.entry.line, 1);
        assert!(matches!(
            failure.status,
            TaskStatus::Failed {
                kind: FailureKind::Transform,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn cancelled_job_runs_no_batches() {
        let (db, _db_file) = sqlite_store().await;
        let fetcher = Arc::new(TableFetcher::default());
        let input = url_file(&["http://h1.test/"]);
        let token = CancellationToken::new();
        token.cancel();

        let report = BatchJob::new(Parallelism::new(4).unwrap(), db, &JobConfig::default())
            .with_fetcher(fetcher.clone())
            .with_cancel_token(token)
            .run(input.path())
            .await
            .unwrap();

        assert_eq!(report.halted, Some(HaltReason::Cancelled));
        assert!(fetcher.seen.lock().unwrap().is_empty());
    }
}
