//! Transformation step applied to each fetched body

use crate::Result;
use crate::config::TransformConfig;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Turns a fetched body into the payload that gets persisted
///
/// Implementations must be safe to share across all workers of a batch.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Produce the payload for `body`
    async fn apply(&self, body: String) -> Result<String>;
}

/// Returns the body unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

#[async_trait]
impl Transform for Identity {
    async fn apply(&self, body: String) -> Result<String> {
        Ok(body)
    }
}

/// Sleeps a random duration, then returns the body unchanged
///
/// Stands in for real processing work when measuring throughput.
#[derive(Debug, Clone, Copy)]
pub struct RandomDelay {
    min: Duration,
    max: Duration,
}

impl RandomDelay {
    /// Delay uniformly drawn from `[min, max]`; the bounds are swapped if reversed
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    fn pick(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

#[async_trait]
impl Transform for RandomDelay {
    async fn apply(&self, body: String) -> Result<String> {
        tokio::time::sleep(self.pick()).await;
        Ok(body)
    }
}

/// Build the transform described by `config`
pub fn from_config(config: &TransformConfig) -> Arc<dyn Transform> {
    match config {
        TransformConfig::Identity => Arc::new(Identity),
        TransformConfig::RandomDelay { min, max } => Arc::new(RandomDelay::new(*min, *max)),
    }
}
