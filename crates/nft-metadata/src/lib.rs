//! NFT token metadata retrieval
//!
//! Downloads the off-chain metadata document of every token in an id range of
//! an ERC-721 collection and stores one file per token.
//!
//! # Stages
//!
//! - **Planner**: splits the id range into contiguous batches
//! - **Resolver**: one aggregated `tokenURI` read per batch
//! - **Router**: rewrites `ipfs://` URIs and skips tokens already on disk
//! - **Fetch workers**: HTTP GET with linear backoff
//! - **Persist workers**: write documents to the [`store::ArtifactStore`]
//!
//! [`pipeline::MetadataPipeline`] runs them as a bounded-queue pipeline.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use alloy::primitives::{address, U256};
//! use nft_metadata::{FetchConfig, FsArtifactStore, MetadataPipeline, RpcChainClient};
//!
//! #[tokio::main]
//! async fn main() -> nft_metadata::Result<()> {
//!     let config = FetchConfig::default();
//!     let chain = Arc::new(RpcChainClient::connect("http://localhost:8545")?);
//!     let store = Arc::new(FsArtifactStore::new(&config.output_dir));
//!     let pipeline = MetadataPipeline::new(chain, store, config)?;
//!
//!     let collection = address!("BC4CA0EdA7647A8aB7C2061c2E118A18a936f13D");
//!     let report = pipeline.run(collection, U256::ZERO, U256::from(99)).await?;
//!     println!("persisted {} documents", report.persisted);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod chain;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod persister;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod resolver;
pub mod router;
pub mod store;
pub mod types;

pub use chain::{ChainClient, RpcChainClient};
pub use config::FetchConfig;
pub use error::{MetadataError, ResolveError, Result, Unresolved};
pub use pipeline::MetadataPipeline;
pub use report::RunReport;
pub use store::{ArtifactStore, FsArtifactStore};
pub use types::TokenId;
