//! Persistence workers
//!
//! Write failures are recorded per token and not retried.

use std::sync::Arc;

use alloy::primitives::Address;
use async_channel::Receiver;
use tracing::{error, info};

use crate::error::Unresolved;
use crate::store::ArtifactStore;
use crate::types::{FetchResult, TokenId};

#[derive(Debug, Default)]
pub struct PersistWorkerReport {
    pub persisted: usize,
    pub failed: Vec<(TokenId, Unresolved)>,
}

/// Drain `responses` until it is closed and empty, writing each body to `store`.
pub async fn run_persist_worker(
    worker: usize,
    store: Arc<dyn ArtifactStore>,
    collection: Address,
    responses: Receiver<FetchResult>,
) -> PersistWorkerReport {
    let mut report = PersistWorkerReport::default();

    while let Ok(FetchResult { token_id, body }) = responses.recv().await {
        match store.write(collection, token_id, body).await {
            Ok(()) => report.persisted += 1,
            Err(e) => {
                error!(token_id = %token_id, error = %e, "Failed to persist metadata");
                report.failed.push((token_id, Unresolved::Persist(e.to_string())));
            },
        }
    }

    info!(worker, persisted = report.persisted, failed = report.failed.len(), "Persist worker finished");
    report
}
