//! DeFi Registry Reader — Entry Point
//!
//! Reads protocol balances from the on-chain adapter registry and prints
//! them normalized, with derivative tokens decomposed.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from the first argument) + validate
//! 2. Init tracing (JSON structured logging on stderr)
//! 3. Connect the RPC provider and bind the registry contract
//! 4. Build the RegistryQuery façade with the decomposition settings
//! 5. Run every configured query concurrently
//! 6. Render the report to stdout; SIGINT abandons in-flight queries

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use tokio::signal;
use tracing::{info, warn};

use defi_registry_reader::adapters::chain::{ChainProvider, RegistryContract};
use defi_registry_reader::adapters::output::{
    self, MetadataEntry, OwnerBalances, RunReport, TokenEntry,
};
use defi_registry_reader::config::{self, AppConfig};
use defi_registry_reader::usecases::RegistryQuery;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        output = ?config.app.output,
        "Starting DeFi registry reader"
    );

    // ── 3. Connect provider + bind registry ─────────────────
    let provider = Arc::new(
        ChainProvider::connect(&config.chain)
            .await
            .context("Failed to connect chain provider")?,
    );
    let chain_id = provider.chain_id();
    let registry = Arc::new(
        RegistryContract::new(Arc::clone(&provider), &config.chain)
            .await
            .context("Failed to bind adapter registry")?,
    );

    // ── 4. Build the query façade ───────────────────────────
    let query = RegistryQuery::new(registry, &config.decomposition);

    // ── 5. Run queries until done or SIGINT ─────────────────
    let report = tokio::select! {
        report = run_queries(&query, &config, chain_id) => report?,
        _ = signal::ctrl_c() => {
            warn!("SIGINT received, abandoning in-flight queries");
            return Ok(());
        }
    };

    // ── 6. Render ───────────────────────────────────────────
    let rendered = output::render(&report, config.app.output)?;
    println!("{rendered}");

    info!("Done");
    Ok(())
}

/// Issue every configured query concurrently and collect the results.
async fn run_queries(
    query: &RegistryQuery<RegistryContract>,
    config: &AppConfig,
    chain_id: u64,
) -> Result<RunReport> {
    let owner = config.query.owner()?;
    let tokens = config
        .query
        .tokens
        .iter()
        .map(|token| Ok((token, token.address()?)))
        .collect::<Result<Vec<_>>>()?;

    let names = async {
        if config.query.list_protocols {
            query.list_protocol_names().await.map(Some)
        } else {
            Ok(None)
        }
    };

    let metadata = query.describe_protocols(&config.query.metadata);

    let balances = async {
        match owner {
            Some(owner) => query
                .protocol_balances(owner, &config.query.protocols)
                .await
                .map(|protocols| {
                    Some(OwnerBalances {
                        owner: owner.to_string(),
                        protocols,
                    })
                }),
            None => Ok(None),
        }
    };

    let decompositions = join_all(tokens.iter().map(|(token, address)| async move {
        let result = query.decompose_token(&token.label, *address).await;
        TokenEntry {
            label: token.label.clone(),
            address: address.to_string(),
            error: result.as_ref().err().map(ToString::to_string),
            decomposition: result.ok(),
        }
    }));

    let (names, metadata, balances, tokens) = tokio::join!(names, metadata, balances, decompositions);

    let mut report = RunReport::new(chain_id);
    report.protocol_names = names.context("Failed to list protocols")?;
    report.balances = balances.context("Failed to read protocol balances")?;
    report.tokens = tokens;
    report.metadata = metadata
        .into_iter()
        .map(|(requested, result)| match result {
            Ok(metadata) => MetadataEntry {
                requested,
                metadata: Some(metadata),
                error: None,
            },
            Err(e) => MetadataEntry {
                requested,
                metadata: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(report)
}
