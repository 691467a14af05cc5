//! Error types for metadata retrieval
//!
//! Two kinds of failure exist. [`MetadataError`] is fatal and aborts a run before
//! any batch is resolved. [`Unresolved`] is per token: it is recorded in the
//! [`RunReport`](crate::report::RunReport) and the rest of the run continues.

use alloy::primitives::Address;
use thiserror::Error;

/// Result type alias for fatal pipeline operations
pub type Result<T> = std::result::Result<T, MetadataError>;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// No aggregator contract is known for this network
    #[error("Unsupported chain id {chain_id}. Only Ethereum mainnet (1) is supported.")]
    UnsupportedChain { chain_id: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    /// The chain node could not be reached or rejected a request
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Artifact store error at '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MetadataError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    pub fn store(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Store {
            path: path.into(),
            source,
        }
    }
}

/// Why the aggregated read produced no URI for a token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The whole aggregated call failed; every token of the batch carries this
    #[error("aggregated call to {aggregator} failed: {reason}")]
    BatchCall { aggregator: Address, reason: String },

    #[error("aggregator returned {actual} results for {expected} calls")]
    ResultCount { expected: usize, actual: usize },

    /// `tokenURI` reverted for this token (nonexistent or burned token, usually)
    #[error("tokenURI call reverted")]
    Reverted,

    #[error("could not decode tokenURI return data: {0}")]
    Decode(String),
}

/// Final state of a token that was not persisted during a run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    #[error("resolve failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("fetch failed after {attempts} attempt(s): {reason}")]
    Fetch { attempts: u32, reason: String },

    #[error("write failed: {0}")]
    Persist(String),
}
