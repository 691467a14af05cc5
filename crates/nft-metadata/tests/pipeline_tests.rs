//! End-to-end runs of the metadata pipeline against an in-process chain client
//! and a wiremock HTTP server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use common::{echo_metadata, metadata_json, test_config, MockChainClient, COLLECTION};
use nft_metadata::store::collection_key;
use nft_metadata::{
    ArtifactStore, FsArtifactStore, MetadataError, MetadataPipeline, ResolveError, Unresolved,
};
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

fn pipeline(chain: Arc<MockChainClient>, dir: &TempDir, gateway: &str) -> MetadataPipeline {
    let config = test_config(dir.path(), gateway);
    let store = Arc::new(FsArtifactStore::new(dir.path()));
    MetadataPipeline::new(chain, store, config).unwrap()
}

fn http_uris(base: String) -> impl Fn(U256) -> Option<String> + Send + Sync + 'static {
    move |id| Some(format!("{base}/token/{id}"))
}

#[tokio::test]
async fn test_fetches_every_token_in_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/token/\d+$"))
        .respond_with(echo_metadata)
        .expect(150)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let chain = Arc::new(MockChainClient::new(http_uris(server.uri())));
    let pipeline = pipeline(chain.clone(), &dir, "https://gateway.ipfs.io");

    let report = pipeline
        .run(COLLECTION, U256::ZERO, U256::from(149))
        .await
        .unwrap();

    assert_eq!(report.requested, 150);
    assert_eq!(report.batches, 3);
    assert_eq!(report.resolved, 150);
    assert_eq!(report.fetched, 150);
    assert_eq!(report.persisted, 150);
    assert!(report.is_clean(), "unexpected failures: {:?}", report.unresolved);
    assert_eq!(chain.calls(), 3);

    let collection_dir = dir.path().join(collection_key(COLLECTION));
    let mut names: Vec<String> = std::fs::read_dir(&collection_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    let mut expected: Vec<String> = (0..150).map(|id| format!("{id}.json")).collect();
    expected.sort();
    assert_eq!(names, expected);

    let body = std::fs::read(collection_dir.join("42.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc, metadata_json("42"));
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/token/\d+$"))
        .respond_with(echo_metadata)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let chain = Arc::new(MockChainClient::new(http_uris(server.uri())));
    let pipeline = pipeline(chain, &dir, "https://gateway.ipfs.io");

    let first = pipeline
        .run(COLLECTION, U256::from(10), U256::from(29))
        .await
        .unwrap();
    assert_eq!(first.persisted, 20);

    let second = pipeline
        .run(COLLECTION, U256::from(10), U256::from(29))
        .await
        .unwrap();
    assert_eq!(second.skipped_existing, 20);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.persisted, 0);
    assert!(second.is_clean());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 20);
}

#[tokio::test]
async fn test_empty_range_terminates() {
    let dir = TempDir::new().unwrap();
    let chain = Arc::new(MockChainClient::new(|_| Some("https://example.invalid/x".into())));
    let pipeline = pipeline(chain.clone(), &dir, "https://gateway.ipfs.io");

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline.run(COLLECTION, U256::from(10), U256::from(5)),
    )
    .await
    .expect("pipeline did not shut down")
    .unwrap();

    assert_eq!(report.batches, 0);
    assert_eq!(report.requested, 0);
    assert_eq!(report.persisted, 0);
    assert!(report.is_clean());
    assert_eq!(chain.calls(), 0);
}

#[tokio::test]
async fn test_unsupported_chain_aborts_before_work() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(echo_metadata)
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let chain = Arc::new(MockChainClient::new(http_uris(server.uri())).with_chain_id(5));
    let pipeline = pipeline(chain.clone(), &dir, "https://gateway.ipfs.io");

    let err = pipeline
        .run(COLLECTION, U256::ZERO, U256::from(99))
        .await
        .unwrap_err();

    assert!(matches!(err, MetadataError::UnsupportedChain { chain_id: 5 }));
    assert_eq!(chain.calls(), 0);
    assert!(!dir.path().join(collection_key(COLLECTION)).exists());
}

#[tokio::test]
async fn test_reverted_token_does_not_affect_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/token/\d+$"))
        .respond_with(echo_metadata)
        .mount(&server)
        .await;

    let base = server.uri();
    let chain = Arc::new(MockChainClient::new(move |id| {
        (id != U256::from(3)).then(|| format!("{base}/token/{id}"))
    }));
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(chain, &dir, "https://gateway.ipfs.io");

    let report = pipeline
        .run(COLLECTION, U256::ZERO, U256::from(9))
        .await
        .unwrap();

    assert_eq!(report.persisted, 9);
    assert_eq!(report.unresolved_count(), 1);
    assert_eq!(
        report.unresolved.get(&U256::from(3)),
        Some(&Unresolved::Resolve(ResolveError::Reverted))
    );

    let store = FsArtifactStore::new(dir.path());
    assert!(!store.exists(COLLECTION, U256::from(3)).await.unwrap());
    assert!(store.exists(COLLECTION, U256::from(4)).await.unwrap());
}

#[tokio::test]
async fn test_failed_batch_call_reports_every_token() {
    let dir = TempDir::new().unwrap();
    let chain = Arc::new(
        MockChainClient::new(|_| Some("https://example.invalid/x".into())).failing_calls(),
    );
    let pipeline = pipeline(chain.clone(), &dir, "https://gateway.ipfs.io");

    let report = pipeline
        .run(COLLECTION, U256::ZERO, U256::from(59))
        .await
        .unwrap();

    assert_eq!(chain.calls(), 2);
    assert_eq!(report.resolved, 0);
    assert_eq!(report.unresolved_count(), 60);
    assert!(report
        .unresolved
        .values()
        .all(|reason| matches!(reason, Unresolved::Resolve(ResolveError::BatchCall { .. }))));
}

#[tokio::test]
async fn test_ipfs_uris_go_through_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipfs/QmCollection/\d+$"))
        .respond_with(echo_metadata)
        .expect(5)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let chain = Arc::new(MockChainClient::new(|id| Some(format!("ipfs://QmCollection/{id}"))));
    let pipeline = pipeline(chain, &dir, &server.uri());

    let report = pipeline
        .run(COLLECTION, U256::from(1), U256::from(5))
        .await
        .unwrap();

    assert_eq!(report.persisted, 5);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_unsupported_schemes_are_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(echo_metadata)
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let chain = Arc::new(MockChainClient::new(|id| {
        Some(format!("data:application/json;base64,{id}"))
    }));
    let pipeline = pipeline(chain, &dir, &server.uri());

    let report = pipeline
        .run(COLLECTION, U256::ZERO, U256::from(3))
        .await
        .unwrap();

    assert_eq!(report.resolved, 4);
    assert_eq!(report.dropped_unsupported, 4);
    assert_eq!(report.persisted, 0);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_unreachable_document_is_reported_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token/7"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/token/\d+$"))
        .respond_with(echo_metadata)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let chain = Arc::new(MockChainClient::new(http_uris(server.uri())));
    let pipeline = pipeline(chain, &dir, "https://gateway.ipfs.io");

    let report = pipeline
        .run(COLLECTION, U256::from(5), U256::from(9))
        .await
        .unwrap();

    assert_eq!(report.persisted, 4);
    assert_eq!(report.fetch_failures(), 1);
    match report.unresolved.get(&U256::from(7)) {
        Some(Unresolved::Fetch { attempts, reason }) => {
            assert_eq!(*attempts, 5);
            assert!(reason.contains("503"), "{reason}");
        },
        other => panic!("expected fetch failure for token 7, got {other:?}"),
    }

    let store = FsArtifactStore::new(dir.path());
    assert!(!store.exists(COLLECTION, U256::from(7)).await.unwrap());
    assert!(store.exists(COLLECTION, U256::from(8)).await.unwrap());
}
