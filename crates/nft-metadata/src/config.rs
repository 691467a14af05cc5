//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{MetadataError, Result};
use crate::fetcher::RetryPolicy;
use crate::router::UriPolicy;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Token ids per aggregated `tokenURI` call.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Largest batch a single aggregated call may carry.
pub const MAX_BATCH_SIZE: usize = 50;

/// Batches resolved at the same time.
pub const DEFAULT_RESOLVER_CONCURRENCY: usize = 8;

/// Fetch workers draining the request queue.
pub const DEFAULT_FETCH_WORKERS: usize = 10;

/// Persistence workers draining the response queue.
pub const DEFAULT_PERSIST_WORKERS: usize = 10;

/// Attempts per metadata document, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Linear backoff unit in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 2_000;

/// Capacity of each inter-stage queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Per-request HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Gateway used to rewrite `ipfs://` URIs.
pub const DEFAULT_IPFS_GATEWAY: &str = "https://gateway.ipfs.io";

/// Root of the artifact store.
pub const DEFAULT_OUTPUT_DIR: &str = "./metadata";

/// Tuning knobs of a metadata run
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub batch_size: usize,
    pub resolver_concurrency: usize,
    pub fetch_workers: usize,
    pub persist_workers: usize,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub channel_capacity: usize,
    pub http_timeout_secs: u64,
    pub ipfs_gateway: String,
    pub follow_ipfs: bool,
    pub output_dir: PathBuf,
}

impl FetchConfig {
    /// Load configuration from `.env`, `NFT_*` variables and defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            batch_size: env_parse("NFT_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            resolver_concurrency: env_parse("NFT_RESOLVER_CONCURRENCY")?
                .unwrap_or(defaults.resolver_concurrency),
            fetch_workers: env_parse("NFT_FETCH_WORKERS")?.unwrap_or(defaults.fetch_workers),
            persist_workers: env_parse("NFT_PERSIST_WORKERS")?.unwrap_or(defaults.persist_workers),
            max_attempts: env_parse("NFT_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
            backoff_ms: env_parse("NFT_BACKOFF_MS")?.unwrap_or(defaults.backoff_ms),
            channel_capacity: env_parse("NFT_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.channel_capacity),
            http_timeout_secs: env_parse("NFT_HTTP_TIMEOUT_SECS")?
                .unwrap_or(defaults.http_timeout_secs),
            ipfs_gateway: std::env::var("NFT_IPFS_GATEWAY").unwrap_or(defaults.ipfs_gateway),
            follow_ipfs: env_parse("NFT_FOLLOW_IPFS")?.unwrap_or(defaults.follow_ipfs),
            output_dir: std::env::var("NFT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("batch_size", self.batch_size),
            ("resolver_concurrency", self.resolver_concurrency),
            ("fetch_workers", self.fetch_workers),
            ("persist_workers", self.persist_workers),
            ("channel_capacity", self.channel_capacity),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(MetadataError::config(format!("{name} must be greater than 0")));
            }
        }

        if self.batch_size > MAX_BATCH_SIZE {
            return Err(MetadataError::config(format!(
                "batch_size must be at most {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }

        if self.max_attempts == 0 {
            return Err(MetadataError::config("max_attempts must be greater than 0"));
        }

        if self.http_timeout_secs == 0 {
            return Err(MetadataError::config("http_timeout_secs must be greater than 0"));
        }

        self.gateway_url()?;

        if self.output_dir.as_os_str().is_empty() {
            return Err(MetadataError::config("output_dir cannot be empty"));
        }

        Ok(())
    }

    fn gateway_url(&self) -> Result<Url> {
        let url = Url::parse(&self.ipfs_gateway).map_err(|e| {
            MetadataError::config(format!("invalid IPFS gateway '{}': {e}", self.ipfs_gateway))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MetadataError::config(format!(
                "IPFS gateway must be http or https, got '{}'",
                self.ipfs_gateway
            )));
        }
        Ok(url)
    }

    pub fn uri_policy(&self) -> Result<UriPolicy> {
        Ok(UriPolicy {
            gateway: self.gateway_url()?,
            follow_ipfs: self.follow_ipfs,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_unit: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            resolver_concurrency: DEFAULT_RESOLVER_CONCURRENCY,
            fetch_workers: DEFAULT_FETCH_WORKERS,
            persist_workers: DEFAULT_PERSIST_WORKERS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_string(),
            follow_ipfs: true,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Parse an optional variable. Present but malformed values are an error, not a silent default.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| MetadataError::config(format!("{key}='{raw}': {e}"))),
        Err(_) => Ok(None),
    }
}
