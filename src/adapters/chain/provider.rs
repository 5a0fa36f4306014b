//! RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Connects to the configured JSON-RPC endpoint once at startup and
//! exposes a shared, type-erased provider for registry calls.
//!
//! The transport is picked from the URL (`http(s)://`, `ws(s)://` or an
//! IPC path) via `on_builtin`, so switching transports is a config edit.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::ChainConfig;

/// Shared RPC provider backed by alloy-rs 0.9.
///
/// Uses `dyn Provider` for type erasure so the registry adapter does not
/// depend on which transport was chosen.
pub struct ChainProvider {
    /// The alloy provider (type-erased).
    provider: Arc<dyn Provider + Send + Sync>,
    /// Chain ID reported by the endpoint at connect time.
    chain_id: u64,
}

impl ChainProvider {
    /// Connect and read the chain ID.
    ///
    /// If `expected_chain_id` is configured, a mismatch aborts startup.
    #[instrument(skip_all)]
    pub async fn connect(config: &ChainConfig) -> Result<Self> {
        let provider = bounded(
            config.timeout(),
            "RPC connect",
            ProviderBuilder::new().on_builtin(&config.rpc_url),
        )
        .await?;

        // Wrap in Arc<dyn Provider> for type erasure
        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(provider);

        let chain_id = bounded(config.timeout(), "eth_chainId", provider.get_chain_id()).await?;

        if let Some(expected) = config.expected_chain_id {
            anyhow::ensure!(
                chain_id == expected,
                "Expected chain_id={expected}, endpoint reports {chain_id}"
            );
        }

        info!(chain_id, "Connected to RPC endpoint");

        Ok(Self { provider, chain_id })
    }

    /// Get a shared reference to the alloy provider (type-erased).
    pub fn inner(&self) -> Arc<dyn Provider + Send + Sync> {
        Arc::clone(&self.provider)
    }

    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// Await a provider call, failing if it takes longer than `limit`.
pub(crate) async fn bounded<F, T, E>(limit: Duration, what: &str, call: F) -> Result<T>
where
    F: IntoFuture<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    tokio::time::timeout(limit, call)
        .await
        .with_context(|| format!("{what} timed out after {limit:?}"))?
        .with_context(|| format!("{what} failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;

    #[tokio::test]
    async fn test_stalled_call_times_out() {
        let stalled = std::future::pending::<Result<(), std::io::Error>>();
        let err = bounded(Duration::from_millis(20), "eth_getCode", stalled)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("eth_getCode timed out after"));
    }

    #[tokio::test]
    async fn test_call_error_keeps_source() {
        let failing = async { Err::<(), _>(std::io::Error::other("connection refused")) };
        let err = bounded(Duration::from_secs(1), "eth_chainId", failing)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "eth_chainId failed");
        assert_eq!(err.root_cause().to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_bounded() {
        let config = ChainConfig {
            rpc_url: "ws://10.255.255.1:8546".to_string(),
            registry_address: crate::config::REGISTRY_ADDRESS.to_string(),
            expected_chain_id: None,
            timeout_seconds: 1,
        };
        let started = std::time::Instant::now();
        assert!(ChainProvider::connect(&config).await.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
