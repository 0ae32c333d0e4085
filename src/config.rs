//! Configuration types for batch-fetch
//!
//! Values come from the process environment (after `.env` is loaded by the
//! binary). [`Config::from_lookup`] takes any key lookup so tests never touch
//! the real environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Number of concurrent workers per batch, guaranteed to be in [4, 32]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Parallelism(usize);

impl Parallelism {
    /// Smallest accepted value
    pub const MIN: usize = 4;
    /// Largest accepted value
    pub const MAX: usize = 32;

    /// Validate `value` against [`Self::MIN`]..=[`Self::MAX`]
    pub fn new(value: usize) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::Config {
                message: format!(
                    "parallelism must be between {} and {}, got {}",
                    Self::MIN,
                    Self::MAX,
                    value
                ),
                key: Some("parallelism".to_string()),
            })
        }
    }

    /// Get the inner value
    pub fn get(&self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for Parallelism {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Parallelism> for usize {
    fn from(p: Parallelism) -> Self {
        p.0
    }
}

impl FromStr for Parallelism {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: usize = s.trim().parse().map_err(|_| Error::Config {
            message: format!("parallelism must be a number, got {s:?}"),
            key: Some("parallelism".to_string()),
        })?;
        Self::new(value)
    }
}

impl std::fmt::Display for Parallelism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to do with lines that are empty after trimming
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankLinePolicy {
    /// Drop them (default)
    #[default]
    Skip,
    /// Keep them as work items; they fail as invalid URLs
    Keep,
}

impl FromStr for BlankLinePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "keep" => Ok(Self::Keep),
            other => Err(Error::config(
                ENV_BLANK_LINES,
                format!("expected \"skip\" or \"keep\", got {other:?}"),
            )),
        }
    }
}

/// How a task failure affects the rest of the run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and keep going (default)
    #[default]
    Continue,
    /// Let the failing batch drain, then start no further batches
    StopRun,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "stop_run" | "stop-run" => Ok(Self::StopRun),
            other => Err(Error::config(
                ENV_FAILURE_POLICY,
                format!("expected \"continue\" or \"stop_run\", got {other:?}"),
            )),
        }
    }
}

/// Transformation applied to each fetched body
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformConfig {
    /// Return the body unchanged (default)
    #[default]
    Identity,
    /// Sleep a random duration in `[min, max]`, then return the body unchanged
    RandomDelay {
        /// Lower bound
        #[serde(with = "duration_serde")]
        min: Duration,
        /// Upper bound
        #[serde(with = "duration_serde")]
        max: Duration,
    },
}

impl TransformConfig {
    /// The simulated 1-9 second processing step
    pub fn simulated_work() -> Self {
        Self::RandomDelay {
            min: Duration::from_secs(1),
            max: Duration::from_secs(9),
        }
    }
}

impl FromStr for TransformConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(Self::Identity),
            "random_delay" | "random-delay" => Ok(Self::simulated_work()),
            other => Err(Error::config(
                ENV_TRANSFORM,
                format!("expected \"identity\" or \"random_delay\", got {other:?}"),
            )),
        }
    }
}

/// Connection settings for the results database
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields
    #[serde(default)]
    pub url: Option<String>,

    /// Database name
    #[serde(default)]
    pub name: String,

    /// User name
    #[serde(default)]
    pub user: String,

    /// Password
    #[serde(default)]
    pub password: String,

    /// Host (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port (default: 5432)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum pool connections (default: 32, one per possible worker)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            name: String::new(),
            user: String::new(),
            password: String::new(),
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// Connection URL understood by sqlx
    ///
    /// Uses `url` when set, otherwise builds a PostgreSQL URL with
    /// percent-encoded credentials.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            urlencoding::encode(&self.name),
        )
    }
}

/// Settings of the batch job itself
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    /// Blank line handling
    #[serde(default)]
    pub blank_lines: BlankLinePolicy,

    /// Failure handling
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Per-task timeout (None = wait indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub task_timeout: Option<Duration>,

    /// Transformation step
    #[serde(default)]
    pub transform: TransformConfig,

    /// File used when the given input path is unusable
    #[serde(default = "default_sample_file")]
    pub sample_file: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            blank_lines: BlankLinePolicy::default(),
            failure_policy: FailurePolicy::default(),
            task_timeout: None,
            transform: TransformConfig::default(),
            sample_file: default_sample_file(),
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Results database
    pub database: DatabaseConfig,

    /// Batch job behavior
    #[serde(default)]
    pub job: JobConfig,
}

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_DB_NAME: &str = "POSTGRES_DB";
const ENV_DB_USER: &str = "POSTGRES_USER";
const ENV_DB_PASSWORD: &str = "POSTGRES_PASSWORD";
const ENV_DB_HOST: &str = "POSTGRES_HOST";
const ENV_DB_PORT: &str = "POSTGRES_PORT";
const ENV_BLANK_LINES: &str = "BATCH_FETCH_BLANK_LINES";
const ENV_FAILURE_POLICY: &str = "BATCH_FETCH_FAILURE_POLICY";
const ENV_TASK_TIMEOUT: &str = "BATCH_FETCH_TASK_TIMEOUT_SECS";
const ENV_TRANSFORM: &str = "BATCH_FETCH_TRANSFORM";
const ENV_SAMPLE_FILE: &str = "BATCH_FETCH_SAMPLE_FILE";

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| Error::config(key, format!("{key} is not set")))
        };

        let mut database = DatabaseConfig::default();
        match get(ENV_DATABASE_URL) {
            Some(url) => database.url = Some(url),
            None => {
                database.name = require(ENV_DB_NAME)?;
                database.user = require(ENV_DB_USER)?;
                database.password = require(ENV_DB_PASSWORD)?;
                if let Some(host) = get(ENV_DB_HOST) {
                    database.host = host;
                }
                if let Some(port) = get(ENV_DB_PORT) {
                    database.port = port.trim().parse().map_err(|_| {
                        Error::config(ENV_DB_PORT, format!("invalid port {port:?}"))
                    })?;
                }
            }
        }

        let mut job = JobConfig::default();
        if let Some(v) = get(ENV_BLANK_LINES) {
            job.blank_lines = v.parse()?;
        }
        if let Some(v) = get(ENV_FAILURE_POLICY) {
            job.failure_policy = v.parse()?;
        }
        if let Some(v) = get(ENV_TASK_TIMEOUT) {
            let secs: u64 = v.trim().parse().map_err(|_| {
                Error::config(ENV_TASK_TIMEOUT, format!("invalid number of seconds {v:?}"))
            })?;
            job.task_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(v) = get(ENV_TRANSFORM) {
            job.transform = v.parse()?;
        }
        if let Some(v) = get(ENV_SAMPLE_FILE) {
            job.sample_file = PathBuf::from(v);
        }

        Ok(Self { database, job })
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    Parallelism::MAX as u32
}

fn default_sample_file() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("sample.txt")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
