//! Token URI resolution through one aggregated call per batch
//!
//! Every id of a [`Batch`] becomes a `tokenURI(uint256)` call against the
//! collection. The calls are wrapped into a single Multicall3 `aggregate3` with
//! `allowFailure` set, executed once, and the results are decoded back into one
//! outcome per token, in the order of the batch.
//!
//! A reverted or undecodable entry only affects its own token. A failure of the
//! aggregated call itself is reported once for each token of the batch.

use std::sync::Arc;

use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};
use tracing::{debug, instrument, warn};

use crate::chain::{ChainClient, IERC721Metadata, Multicall3};
use crate::error::ResolveError;
use crate::planner::Batch;
use crate::types::TokenId;

/// Outcome of resolving a single token of a batch
pub type TokenUriOutcome = (TokenId, Result<String, ResolveError>);

pub struct UriResolver {
    chain: Arc<dyn ChainClient>,
    aggregator: Address,
    collection: Address,
}

impl UriResolver {
    pub fn new(chain: Arc<dyn ChainClient>, aggregator: Address, collection: Address) -> Self {
        Self {
            chain,
            aggregator,
            collection,
        }
    }

    /// Build the `aggregate3` calldata for a batch
    pub fn encode_batch(&self, ids: &[TokenId]) -> Bytes {
        let calls = ids
            .iter()
            .map(|id| Multicall3::Call3 {
                target: self.collection,
                allowFailure: true,
                callData: IERC721Metadata::tokenURICall { tokenId: *id }.abi_encode().into(),
            })
            .collect();

        Multicall3::aggregate3Call { calls }.abi_encode().into()
    }

    /// Resolve every token of `batch`. The result has one entry per id, ascending.
    #[instrument(skip(self), fields(start = %batch.start, end = %batch.end))]
    pub async fn resolve(&self, batch: &Batch) -> Vec<TokenUriOutcome> {
        let ids: Vec<TokenId> = batch.ids().collect();
        let calldata = self.encode_batch(&ids);

        match self.chain.call(self.aggregator, calldata).await {
            Ok(raw) => decode_aggregate(&ids, &raw),
            Err(e) => {
                warn!(error = %e, tokens = ids.len(), "Aggregated tokenURI call failed");
                fail_all(
                    &ids,
                    ResolveError::BatchCall {
                        aggregator: self.aggregator,
                        reason: e.to_string(),
                    },
                )
            },
        }
    }
}

/// Split raw `aggregate3` return data into per-token outcomes
pub fn decode_aggregate(ids: &[TokenId], raw: &[u8]) -> Vec<TokenUriOutcome> {
    let results = match Multicall3::aggregate3Call::abi_decode_returns(raw) {
        Ok(results) => results,
        Err(e) => return fail_all(ids, ResolveError::Decode(e.to_string())),
    };

    if results.len() != ids.len() {
        return fail_all(
            ids,
            ResolveError::ResultCount {
                expected: ids.len(),
                actual: results.len(),
            },
        );
    }

    ids.iter()
        .zip(results)
        .map(|(id, result)| (*id, decode_token_uri(*id, &result)))
        .collect()
}

fn decode_token_uri(id: TokenId, result: &Multicall3::Result) -> Result<String, ResolveError> {
    if !result.success {
        debug!(token_id = %id, "tokenURI reverted");
        return Err(ResolveError::Reverted);
    }

    IERC721Metadata::tokenURICall::abi_decode_returns(&result.returnData)
        .map_err(|e| ResolveError::Decode(e.to_string()))
}

fn fail_all(ids: &[TokenId], error: ResolveError) -> Vec<TokenUriOutcome> {
    ids.iter().map(|id| (*id, Err(error.clone()))).collect()
}
