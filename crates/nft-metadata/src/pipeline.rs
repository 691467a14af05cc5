// Metadata pipeline coordinator
//
// Wires the stages together for one collection and id range:
//
//   planner -> resolver (buffer_unordered) -> router -> [requests] -> fetch workers
//           -> [responses] -> persist workers
//
// Shutdown runs in three phases. Once every batch has been resolved and routed
// the request queue is closed and the fetch workers are joined. Only then is the
// response queue closed and the persist workers joined. A closed queue is never
// sent on, and the run returns after every worker has exited.

use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::Address;
use async_channel::Sender;
use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::chain::{aggregator_for_chain, ChainClient};
use crate::config::FetchConfig;
use crate::error::{Result, Unresolved};
use crate::fetcher::{run_fetch_worker, FetchWorkerReport, MetadataFetcher};
use crate::persister::{run_persist_worker, PersistWorkerReport};
use crate::planner::{plan_batches, Batch};
use crate::report::RunReport;
use crate::resolver::UriResolver;
use crate::router::{RequestRouter, Route};
use crate::store::ArtifactStore;
use crate::types::{FetchRequest, ResolvedUri, TokenId};

/// Tallies of the resolve and route stage for one batch
#[derive(Debug, Default)]
struct BatchOutcome {
    requested: usize,
    resolved: usize,
    skipped_existing: usize,
    dropped_unsupported: usize,
    queued: usize,
    unresolved: Vec<(TokenId, Unresolved)>,
}

pub struct MetadataPipeline {
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn ArtifactStore>,
    config: FetchConfig,
}

impl MetadataPipeline {
    /// Create a new pipeline. The configuration is validated here.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn ArtifactStore>,
        config: FetchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            chain,
            store,
            config,
        })
    }

    /// Fetch and persist metadata for every id in `[lower, upper]` of `collection`.
    ///
    /// Errors returned here are fatal and happen before any worker starts.
    /// Per-token failures end up in [`RunReport::unresolved`].
    pub async fn run(&self, collection: Address, lower: TokenId, upper: TokenId) -> Result<RunReport> {
        let start_time = Instant::now();

        let chain_id = self.chain.chain_id().await?;
        let aggregator = aggregator_for_chain(chain_id)?;
        let policy = self.config.uri_policy()?;
        let fetcher = MetadataFetcher::new(self.config.retry_policy(), self.config.http_timeout())?;
        self.store.prepare(collection).await?;

        let batches = plan_batches(lower, upper, self.config.batch_size);

        info!(
            chain_id,
            collection = %collection,
            lower = %lower,
            upper = %upper,
            batch_size = self.config.batch_size,
            fetch_workers = self.config.fetch_workers,
            persist_workers = self.config.persist_workers,
            "Starting metadata pipeline"
        );

        let (request_tx, request_rx) = async_channel::bounded(self.config.channel_capacity);
        let (response_tx, response_rx) = async_channel::bounded(self.config.channel_capacity);

        let fetch_handles: Vec<JoinHandle<FetchWorkerReport>> = (0..self.config.fetch_workers)
            .map(|worker| {
                tokio::spawn(run_fetch_worker(
                    worker,
                    fetcher.clone(),
                    request_rx.clone(),
                    response_tx.clone(),
                ))
            })
            .collect();

        let persist_handles: Vec<JoinHandle<PersistWorkerReport>> = (0..self.config.persist_workers)
            .map(|worker| {
                tokio::spawn(run_persist_worker(
                    worker,
                    self.store.clone(),
                    collection,
                    response_rx.clone(),
                ))
            })
            .collect();

        // The workers hold their own clones; drop ours so only the coordinator's
        // explicit close() decides when a queue ends.
        drop(request_rx);
        drop(response_rx);

        let resolver = UriResolver::new(self.chain.clone(), aggregator, collection);
        let router = RequestRouter::new(policy, self.store.clone(), collection);

        // Batches are planned lazily and folded as they finish, so memory stays
        // bounded by the resolver concurrency rather than the range width.
        let mut report = stream::iter(batches)
            .map(|batch| resolve_and_route(&resolver, &router, batch, &request_tx))
            .buffer_unordered(self.config.resolver_concurrency)
            .fold(RunReport::default(), |mut report, outcome| async move {
                report.batches += 1;
                report.requested += outcome.requested;
                report.resolved += outcome.resolved;
                report.skipped_existing += outcome.skipped_existing;
                report.dropped_unsupported += outcome.dropped_unsupported;
                report.extend_unresolved(outcome.unresolved);
                report
            })
            .await;

        // Phase 1: no more requests; wait for every fetch to finish handing off
        request_tx.close();
        for handle in fetch_handles {
            match handle.await {
                Ok(worker) => {
                    report.fetched += worker.fetched;
                    report.extend_unresolved(worker.failed);
                },
                Err(e) => error!(error = %e, "Fetch worker terminated abnormally"),
            }
        }

        // Phase 2: no more responses; wait for every write
        response_tx.close();
        for handle in persist_handles {
            match handle.await {
                Ok(worker) => {
                    report.persisted += worker.persisted;
                    report.extend_unresolved(worker.failed);
                },
                Err(e) => error!(error = %e, "Persist worker terminated abnormally"),
            }
        }

        let duration = start_time.elapsed();
        info!(
            requested = report.requested,
            resolved = report.resolved,
            skipped_existing = report.skipped_existing,
            dropped_unsupported = report.dropped_unsupported,
            fetched = report.fetched,
            persisted = report.persisted,
            unresolved = report.unresolved_count(),
            duration_secs = duration.as_secs_f64(),
            "Metadata pipeline complete"
        );

        Ok(report)
    }
}

async fn resolve_and_route(
    resolver: &UriResolver,
    router: &RequestRouter,
    batch: Batch,
    requests: &Sender<FetchRequest>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        requested: batch.len(),
        ..BatchOutcome::default()
    };

    for (token_id, result) in resolver.resolve(&batch).await {
        let uri = match result {
            Ok(uri) => uri,
            Err(e) => {
                outcome.unresolved.push((token_id, Unresolved::Resolve(e)));
                continue;
            },
        };
        outcome.resolved += 1;

        match router.route(ResolvedUri { token_id, uri }).await {
            Ok(Route::Fetch(request)) => {
                if requests.send(request).await.is_err() {
                    error!(token_id = %token_id, "Request queue closed while routing");
                    outcome.unresolved.push((
                        token_id,
                        Unresolved::Fetch {
                            attempts: 0,
                            reason: "request queue closed".into(),
                        },
                    ));
                    continue;
                }
                outcome.queued += 1;
            },
            Ok(Route::AlreadyPersisted) => outcome.skipped_existing += 1,
            Ok(Route::Unsupported(uri)) => {
                warn!(token_id = %token_id, uri = %uri, "Dropping token URI with unsupported scheme");
                outcome.dropped_unsupported += 1;
            },
            Err(e) => {
                error!(token_id = %token_id, error = %e, "Existence check failed");
                outcome
                    .unresolved
                    .push((token_id, Unresolved::Persist(format!("existence check failed: {e}"))));
            },
        }
    }

    info!(
        start = %batch.start,
        end = %batch.end,
        resolved = outcome.resolved,
        queued = outcome.queued,
        "Batch routed"
    );

    outcome
}
