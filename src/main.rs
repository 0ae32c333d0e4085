//! `batch-fetch` command-line entry point.
//!
//! Loads `.env`, connects to the results database, asks for the input file
//! and the parallelism, then runs the batch job until every batch is done.

use std::sync::Arc;

use batch_fetch::prompt::{PATH_PROMPT, ask, ask_parallelism, resolve_input_path};
use batch_fetch::{BatchJob, Config, Database, cancel_on_signal};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let db = Arc::new(Database::from_config(&config.database).await?);

    let (path, parallelism) = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();

        let answer = ask(&mut input, &mut output, PATH_PROMPT)?;
        let path = resolve_input_path(&answer, &config.job.sample_file);
        let parallelism = ask_parallelism(&mut input, &mut output)?;
        (path, parallelism)
    };

    let token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(token.clone()));

    let job =
        BatchJob::new(parallelism, db.clone(), &config.job).with_cancel_token(token.clone());
    let result = job.run(&path).await;
    token.cancel();
    drop(job);

    match Arc::try_unwrap(db) {
        Ok(db) => db.close().await,
        Err(shared) => shared.pool().close().await,
    }
    let report = result?;

    for failure in report.failures() {
        tracing::warn!(
            line = failure.entry.line,
            url = %failure.entry.url,
            status = ?failure.status,
            "URL was not stored"
        );
    }
    tracing::info!(
        stored = report.succeeded(),
        failed = report.failed(),
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        "Batch job finished"
    );

    Ok(())
}
