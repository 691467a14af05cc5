//! `nft-tools fetch-metadata` command implementation
//!
//! Downloads the metadata document of every token in the requested range and
//! stores it as `<output-dir>/<collection>/<token_id>.json`.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use nft_metadata::{FetchConfig, FsArtifactStore, MetadataPipeline, RpcChainClient, RunReport};

use crate::error::Result;
use crate::progress;
use crate::FetchMetadataArgs;

/// Unresolved tokens listed individually in the summary
const MAX_LISTED_FAILURES: usize = 10;

/// Run the pipeline and print a summary. Per-token failures are not an error.
pub async fn run(args: FetchMetadataArgs) -> Result<RunReport> {
    let config = build_config(&args)?;
    let max_attempts = config.max_attempts;

    if args.lower_token_id > args.upper_token_id {
        println!(
            "{} Lower token id {} is above upper token id {}, nothing to fetch",
            "!".yellow(),
            args.lower_token_id,
            args.upper_token_id
        );
    }

    println!(
        "{} Fetching metadata for {} tokens {}..={}",
        "→".cyan(),
        args.contract_address,
        args.lower_token_id,
        args.upper_token_id
    );

    let chain = Arc::new(RpcChainClient::connect(&args.rpc_http_url)?);
    let store = Arc::new(FsArtifactStore::new(&config.output_dir));
    let collection_dir = store.collection_dir(args.contract_address);
    let pipeline = MetadataPipeline::new(chain, store, config)?;

    let spinner = progress::create_spinner("Resolving token URIs and downloading metadata...");
    let result = pipeline
        .run(args.contract_address, args.lower_token_id, args.upper_token_id)
        .await;
    spinner.finish_and_clear();

    let report = result?;
    print_summary(&report, &collection_dir, max_attempts);
    Ok(report)
}

/// Environment configuration with command-line overrides applied
pub fn build_config(args: &FetchMetadataArgs) -> Result<FetchConfig> {
    let mut config = FetchConfig::from_env()?;

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(gateway) = &args.ipfs_gateway {
        config.ipfs_gateway = gateway.clone();
    }
    if args.no_follow_ipfs {
        config.follow_ipfs = false;
    }
    if let Some(workers) = args.fetch_workers {
        config.fetch_workers = workers;
    }
    if let Some(workers) = args.persist_workers {
        config.persist_workers = workers;
    }
    if let Some(concurrency) = args.resolver_concurrency {
        config.resolver_concurrency = concurrency;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(report: &RunReport, collection_dir: &Path, max_attempts: u32) {
    println!(
        "{} {} document(s) stored in {}",
        "✓".green(),
        report.persisted,
        collection_dir.display()
    );
    println!(
        "  {} requested, {} resolved, {} already stored, {} unsupported URI(s), {} fetched",
        report.requested,
        report.resolved,
        report.skipped_existing,
        report.dropped_unsupported,
        report.fetched
    );

    if report.is_clean() {
        println!("\n{} All tokens processed", "✓".green().bold());
        return;
    }

    println!(
        "\n{} {} token(s) unresolved ({} failed after {} attempts)",
        "⚠".yellow().bold(),
        report.unresolved_count(),
        report.fetch_failures(),
        max_attempts
    );
    for (token_id, reason) in report.unresolved.iter().take(MAX_LISTED_FAILURES) {
        println!("  {} token {}: {}", "✗".red(), token_id, reason);
    }
    if report.unresolved_count() > MAX_LISTED_FAILURES {
        println!(
            "  ... and {} more (run with --verbose for details)",
            report.unresolved_count() - MAX_LISTED_FAILURES
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Commands};
    use clap::Parser;

    fn args(extra: &[&str]) -> FetchMetadataArgs {
        let mut argv = vec![
            "nft-tools",
            "fetch-metadata",
            "--rpc-http-url",
            "http://localhost:8545",
            "--contract-address",
            "0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d",
        ];
        argv.extend_from_slice(extra);
        let Commands::FetchMetadata(args) = Cli::try_parse_from(argv).unwrap().command;
        args
    }

    #[test]
    fn test_flags_override_config() {
        let config = build_config(&args(&[
            "--output-dir",
            "/tmp/nft-out",
            "--ipfs-gateway",
            "https://ipfs.example.org",
            "--no-follow-ipfs",
            "--fetch-workers",
            "3",
            "--persist-workers",
            "2",
            "--resolver-concurrency",
            "1",
        ]))
        .unwrap();

        assert_eq!(config.output_dir, std::path::PathBuf::from("/tmp/nft-out"));
        assert_eq!(config.ipfs_gateway, "https://ipfs.example.org");
        assert!(!config.follow_ipfs);
        assert_eq!(config.fetch_workers, 3);
        assert_eq!(config.persist_workers, 2);
        assert_eq!(config.resolver_concurrency, 1);
    }

    #[test]
    fn test_zero_workers_flag_rejected() {
        let err = build_config(&args(&["--fetch-workers", "0"])).unwrap_err();
        assert!(err.to_string().contains("fetch_workers"));
    }
}
