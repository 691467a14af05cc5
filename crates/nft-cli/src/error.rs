//! Error types for the nft-tools CLI
//!
//! Messages are user-facing and end with a hint on how to fix the problem.

use nft_metadata::MetadataError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// The node is on a network without a known aggregator contract
    #[error("Unsupported chain id {0}. Point --rpc-http-url at an Ethereum mainnet node.")]
    UnsupportedChain(u64),

    /// The node could not be reached or answered with an error
    #[error("RPC error: {0}. Check that the node at --rpc-http-url is reachable.")]
    Rpc(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your command-line flags and NFT_* environment variables.")]
    Config(String),

    /// Output directory could not be prepared or read
    #[error("{0}. Check file permissions and disk space for --output-dir.")]
    Storage(MetadataError),

    #[error(transparent)]
    Pipeline(MetadataError),
}

impl From<MetadataError> for CliError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::UnsupportedChain { chain_id } => Self::UnsupportedChain(chain_id),
            MetadataError::Rpc(msg) => Self::Rpc(msg),
            MetadataError::Config(msg) => Self::Config(msg),
            err @ MetadataError::Store { .. } => Self::Storage(err),
            err => Self::Pipeline(err),
        }
    }
}
