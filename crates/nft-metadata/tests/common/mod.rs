//! Shared fixtures for nft-metadata integration tests
//!
//! [`MockChainClient`] answers `aggregate3` calls in-process: it decodes the
//! calldata, asks a closure for each token's URI and ABI-encodes the results.
//! Pair it with a `wiremock` server for the HTTP side.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::{address, Address, Bytes};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use nft_metadata::chain::{IERC721Metadata, Multicall3};
use nft_metadata::{ChainClient, FetchConfig, MetadataError, TokenId};
use wiremock::{Request, ResponseTemplate};

pub const COLLECTION: Address = address!("BC4CA0EdA7647A8aB7C2061c2E118A18a936f13D");

type UriFn = dyn Fn(TokenId) -> Option<String> + Send + Sync;

/// In-process chain node. `None` from the URI closure makes that token revert.
pub struct MockChainClient {
    chain_id: u64,
    uri_for: Box<UriFn>,
    fail_calls: bool,
    calls: AtomicUsize,
}

impl MockChainClient {
    pub fn new(uri_for: impl Fn(TokenId) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            chain_id: 1,
            uri_for: Box::new(uri_for),
            fail_calls: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Make every aggregated call fail as if the node rejected it
    pub fn failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    /// Number of `eth_call` requests received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn chain_id(&self) -> nft_metadata::Result<u64> {
        Ok(self.chain_id)
    }

    async fn call(&self, _to: Address, data: Bytes) -> nft_metadata::Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_calls {
            return Err(MetadataError::rpc("execution timeout"));
        }

        let batch = Multicall3::aggregate3Call::abi_decode(&data)
            .map_err(|e| MetadataError::rpc(format!("bad aggregate3 calldata: {e}")))?;

        let mut results = Vec::with_capacity(batch.calls.len());
        for call in batch.calls {
            let token = IERC721Metadata::tokenURICall::abi_decode(&call.callData)
                .map_err(|e| MetadataError::rpc(format!("bad tokenURI calldata: {e}")))?;

            let result = match (self.uri_for)(token.tokenId) {
                Some(uri) => Multicall3::Result {
                    success: true,
                    returnData: IERC721Metadata::tokenURICall::abi_encode_returns(&uri).into(),
                },
                None => Multicall3::Result {
                    success: false,
                    returnData: Bytes::new(),
                },
            };
            results.push(result);
        }

        Ok(Multicall3::aggregate3Call::abi_encode_returns(&results).into())
    }
}

/// Configuration with small pools and millisecond backoff
pub fn test_config(output_dir: &Path, gateway: &str) -> FetchConfig {
    FetchConfig {
        fetch_workers: 4,
        persist_workers: 2,
        backoff_ms: 5,
        channel_capacity: 8,
        http_timeout_secs: 5,
        ipfs_gateway: gateway.to_string(),
        output_dir: output_dir.to_path_buf(),
        ..FetchConfig::default()
    }
}

/// Metadata document served for a token
pub fn metadata_json(token_id: &str) -> serde_json::Value {
    serde_json::json!({
        "name": format!("Token #{token_id}"),
        "image": format!("ipfs://QmImages/{token_id}.png"),
        "attributes": [{ "trait_type": "Background", "value": "Blue" }],
    })
}

/// Responder that echoes the last path segment back as a metadata document
pub fn echo_metadata(request: &Request) -> ResponseTemplate {
    let token_id = request.url.path().rsplit('/').next().unwrap_or_default().to_string();
    ResponseTemplate::new(200).set_body_json(metadata_json(&token_id))
}
