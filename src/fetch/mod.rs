//! Fetch-transform unit: retrieves one URL and produces the payload to persist.
//!
//! [`PageFetcher`] is the seam the coordinator works against;
//! [`HttpFetcher`] is the production implementation built on `reqwest`.

use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

pub mod transform;

pub use transform::{Identity, RandomDelay, Transform};

/// Abstraction over fetching and transforming one URL, enabling testability.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the transformed payload
    async fn fetch_and_transform(&self, url: &str) -> Result<String>;
}

/// Production [`PageFetcher`] that issues a plain HTTP GET.
///
/// The client keeps reqwest's defaults: no request timeout, the default
/// redirect policy, and no retries.
pub struct HttpFetcher {
    client: reqwest::Client,
    transform: Arc<dyn Transform>,
}

impl HttpFetcher {
    /// Fetcher with a default client and the given transform
    pub fn new(transform: Arc<dyn Transform>) -> Self {
        Self::with_client(reqwest::Client::new(), transform)
    }

    /// Fetcher sharing an existing client
    pub fn with_client(client: reqwest::Client, transform: Arc<dyn Transform>) -> Self {
        Self { client, transform }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Arc::new(Identity))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_and_transform(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            // Bodies of error responses are persisted like any other
            tracing::warn!(url = %url, status = %status, "Non-success HTTP status");
        }
        let body = response.text().await?;

        let start = Instant::now();
        let payload = self.transform.apply(body).await?;
        let elapsed_secs = (start.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        tracing::info!(url = %url, elapsed_secs, "Data was processed");

        Ok(payload)
    }
}
