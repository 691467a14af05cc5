//! Read-only access to the chain node
//!
//! The pipeline only needs two capabilities from a node: the chain id (to pick
//! the aggregator contract) and `eth_call`. [`ChainClient`] captures exactly
//! that so tests can answer calls in-process.

use alloy::{
    network::TransactionBuilder,
    primitives::{address, Address, Bytes},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    sol,
};
use async_trait::async_trait;
use tracing::debug;

use crate::error::{MetadataError, Result};

sol! {
    /// ERC-721 metadata extension, only the read we need.
    interface IERC721Metadata {
        function tokenURI(uint256 tokenId) external view returns (string memory);
    }

    /// Multicall3 aggregator. See https://www.multicall3.com/
    contract Multicall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) public payable returns (Result[] memory returnData);
    }
}

/// Networks with a known aggregator deployment: (chain id, Multicall3 address)
pub const SUPPORTED_NETWORKS: &[(u64, Address)] =
    &[(1, address!("cA11bde05977b3631167028862bE2a173976CA11"))];

/// Aggregator contract for a chain id.
///
/// An unknown chain id is a configuration problem, not a transient fault.
pub fn aggregator_for_chain(chain_id: u64) -> Result<Address> {
    SUPPORTED_NETWORKS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, aggregator)| *aggregator)
        .ok_or(MetadataError::UnsupportedChain { chain_id })
}

/// Read-only contract call capability of a chain node
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    /// Execute `eth_call` against `to` with raw calldata and return the raw output
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;
}

/// [`ChainClient`] backed by an alloy HTTP provider
#[derive(Clone)]
pub struct RpcChainClient {
    provider: DynProvider,
}

impl RpcChainClient {
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| MetadataError::config(format!("invalid RPC URL '{rpc_url}': {e}")))?;
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(url)
            .erased();
        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| MetadataError::rpc(format!("eth_chainId failed: {e}")))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        debug!(to = %to, calldata_len = data.len(), "eth_call");
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.provider
            .call(tx)
            .await
            .map_err(|e| MetadataError::rpc(format!("eth_call to {to} failed: {e}")))
    }
}
