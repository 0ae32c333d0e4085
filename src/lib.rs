//! # batch-fetch
//!
//! Fetches a list of URLs in bounded parallel batches and persists each
//! response body as a row of a `results` table.
//!
//! The input file is split into batches of `parallelism` URLs. Each batch
//! runs on a fresh pool of workers, one per URL, and the next batch starts
//! only after every task of the current one has finished or failed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use batch_fetch::{Database, JobConfig, Parallelism, run_batch_job};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://results.db?mode=rwc", 8).await?;
//!
//!     let report = run_batch_job(
//!         Path::new("urls.txt"),
//!         Parallelism::new(8)?,
//!         Arc::new(db),
//!         &JobConfig::default(),
//!     )
//!     .await?;
//!
//!     println!("{} stored, {} failed", report.succeeded(), report.failed());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Partitioning into batches
pub mod batching;
/// Configuration types
pub mod config;
/// Batch coordinator and worker pools
pub mod coordinator;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// HTTP fetching and transformation
pub mod fetch;
/// Batch job entry point
pub mod job;
/// Interactive prompts for the binary
pub mod prompt;
/// Reading the URL list
pub mod source;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{BlankLinePolicy, Config, FailurePolicy, JobConfig, Parallelism};
pub use coordinator::BatchCoordinator;
pub use db::{Database, ResultRecord, ResultStore};
pub use error::{DatabaseError, Error, Result};
pub use fetch::{HttpFetcher, PageFetcher, Transform};
pub use job::{BatchJob, run_batch_job};
pub use types::{
    BatchReport, Event, FailureKind, HaltReason, RunReport, TaskOutcome, TaskStatus, UrlEntry,
};

/// Cancel `token` when a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// In-flight tasks resolve as cancelled and no further batch starts.
pub async fn cancel_on_signal(token: tokio_util::sync::CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => {
            tracing::warn!("Cancelling batch job");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
