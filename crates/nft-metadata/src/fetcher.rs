//! Metadata document retrieval with bounded retry
//!
//! Each attempt is a plain GET. Transport errors and non-2xx responses count as
//! failures. After failed attempt `k` the fetcher waits `k * backoff_unit` before
//! trying again, so delays grow linearly and strictly. Once `max_attempts` is
//! spent the token is given up on; the pipeline keeps going.

use std::time::Duration;

use async_channel::{Receiver, Sender};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{MetadataError, Result, Unresolved};
use crate::types::{FetchRequest, FetchResult, TokenId};

/// User agent sent with every metadata request
pub const USER_AGENT: &str = concat!("nft-tools/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based), or `None` when no attempts remain
    pub fn delay_after(&self, failed_attempt: u32) -> Option<Duration> {
        (failed_attempt < self.max_attempts).then(|| self.backoff_unit * failed_attempt)
    }
}

#[derive(Clone)]
pub struct MetadataFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl MetadataFetcher {
    pub fn new(retry: RetryPolicy, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(MetadataError::Http)?;

        Ok(Self { client, retry })
    }

    /// Retrieve the document for one request, retrying per the policy
    pub async fn fetch(&self, request: &FetchRequest) -> std::result::Result<FetchResult, Unresolved> {
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(Unresolved::Fetch {
                attempts: 0,
                reason: format!("unsupported scheme '{}'", request.url.scheme()),
            });
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(request).await {
                Ok(body) => {
                    debug!(token_id = %request.token_id, attempt, bytes = body.len(), "Fetched metadata");
                    return Ok(FetchResult {
                        token_id: request.token_id,
                        body,
                    });
                },
                Err(reason) => match self.retry.delay_after(attempt) {
                    Some(delay) => {
                        warn!(
                            token_id = %request.token_id,
                            url = %request.url,
                            attempt,
                            max_attempts = self.retry.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %reason,
                            "Metadata fetch failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    },
                    None => {
                        warn!(
                            token_id = %request.token_id,
                            url = %request.url,
                            attempts = attempt,
                            error = %reason,
                            "Could not fetch metadata"
                        );
                        return Err(Unresolved::Fetch {
                            attempts: attempt,
                            reason,
                        });
                    },
                },
            }
        }
    }

    async fn fetch_once(&self, request: &FetchRequest) -> std::result::Result<bytes::Bytes, String> {
        let response = self
            .client
            .get(request.url.clone())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }

        response.bytes().await.map_err(|e| e.to_string())
    }
}

/// What one fetch worker did before the request queue closed
#[derive(Debug, Default)]
pub struct FetchWorkerReport {
    pub fetched: usize,
    pub failed: Vec<(TokenId, Unresolved)>,
}

/// Worker loop: drain `requests` until it is closed and empty.
///
/// Never closes either channel; that is the coordinator's job.
pub async fn run_fetch_worker(
    worker: usize,
    fetcher: MetadataFetcher,
    requests: Receiver<FetchRequest>,
    responses: Sender<FetchResult>,
) -> FetchWorkerReport {
    let mut report = FetchWorkerReport::default();

    while let Ok(request) = requests.recv().await {
        match fetcher.fetch(&request).await {
            Ok(result) => {
                let token_id = result.token_id;
                if responses.send(result).await.is_err() {
                    // Only possible if the coordinator broke its ordering
                    report.failed.push((
                        token_id,
                        Unresolved::Persist("response queue closed before hand-off".into()),
                    ));
                    continue;
                }
                report.fetched += 1;
            },
            Err(unresolved) => report.failed.push((request.token_id, unresolved)),
        }
    }

    info!(worker, fetched = report.fetched, failed = report.failed.len(), "Fetch worker finished");
    report
}
