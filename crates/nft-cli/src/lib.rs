//! nft-tools CLI Library
//!
//! Command-line interface over the `nft-metadata` pipeline.
//!
//! - **Metadata download**: fetch and store the metadata document of every
//!   token in an id range (`nft-tools fetch-metadata`)

pub mod commands;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use error::{CliError, Result};

use std::path::PathBuf;
use std::str::FromStr;

use alloy::primitives::{Address, U256};
use clap::{Args, Parser, Subcommand};

/// nft-tools - NFT collection tooling
#[derive(Parser, Debug)]
#[command(name = "nft-tools")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download token metadata documents of an ERC-721 collection
    FetchMetadata(FetchMetadataArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FetchMetadataArgs {
    /// HTTP JSON-RPC endpoint of an Ethereum mainnet node
    #[arg(long, env = "NFT_RPC_HTTP_URL")]
    pub rpc_http_url: String,

    /// Collection contract address
    #[arg(long, env = "NFT_CONTRACT_ADDRESS", value_parser = parse_address)]
    pub contract_address: Address,

    /// First token id (inclusive, decimal or 0x hex)
    #[arg(long, default_value = "0", value_parser = parse_token_id)]
    pub lower_token_id: U256,

    /// Last token id (inclusive, decimal or 0x hex)
    #[arg(long, default_value = "10000", value_parser = parse_token_id)]
    pub upper_token_id: U256,

    /// Root directory for stored documents [default: ./metadata]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Gateway used for ipfs:// URIs [default: https://gateway.ipfs.io]
    #[arg(long)]
    pub ipfs_gateway: Option<String>,

    /// Drop ipfs:// URIs instead of fetching them through the gateway
    #[arg(long)]
    pub no_follow_ipfs: bool,

    /// Concurrent metadata downloads
    #[arg(long)]
    pub fetch_workers: Option<usize>,

    /// Concurrent file writers
    #[arg(long)]
    pub persist_workers: Option<usize>,

    /// Batches resolved on chain at the same time
    #[arg(long)]
    pub resolver_concurrency: Option<usize>,
}

fn parse_address(s: &str) -> std::result::Result<Address, String> {
    Address::from_str(s.trim()).map_err(|e| format!("invalid contract address '{s}': {e}"))
}

fn parse_token_id(s: &str) -> std::result::Result<U256, String> {
    U256::from_str(s.trim()).map_err(|e| format!("invalid token id '{s}': {e}"))
}
