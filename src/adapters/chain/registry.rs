//! Adapter Registry Contract - DeFi SDK Read Calls
//!
//! Implements the `ChainDataProvider` port on top of a raw `eth_call`:
//! calldata is encoded and return data decoded with `sol!`-generated
//! types, then mapped into the domain's lenient raw records.
//!
//! Every call is bounded by the configured timeout. Failures are
//! returned with context and never retried here.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::config::ChainConfig;
use crate::domain::raw::{
    RawAdapterBalance, RawAdapterMetadata, RawFullTokenBalance, RawProtocolBalance,
    RawProtocolMetadata, RawTokenBalance, RawTokenMetadata,
};
use crate::ports::chain_data::ChainDataProvider;

use super::provider::{ChainProvider, bounded};

sol! {
    struct TokenMetadata {
        address token;
        string name;
        string symbol;
        uint8 decimals;
    }

    struct TokenBalance {
        TokenMetadata metadata;
        uint256 amount;
    }

    struct FullTokenBalance {
        TokenBalance base;
        TokenBalance[] underlying;
    }

    struct AdapterMetadata {
        address adapterAddress;
        string adapterType;
    }

    struct AdapterBalance {
        AdapterMetadata metadata;
        FullTokenBalance[] balances;
    }

    struct ProtocolMetadata {
        string name;
        string description;
        string websiteURL;
        string iconURL;
        uint256 version;
    }

    struct ProtocolBalance {
        ProtocolMetadata metadata;
        AdapterBalance[] adapterBalances;
    }

    interface IAdapterRegistry {
        function getProtocolNames() external view returns (string[] memory);
        function getProtocolMetadata(string calldata protocolName) external view returns (ProtocolMetadata memory);
        function getBalances(address account) external view returns (ProtocolBalance[] memory);
        function getProtocolBalances(address account, string[] calldata protocolNames) external view returns (ProtocolBalance[] memory);
        function getFinalFullTokenBalance(string calldata tokenType, address token) external view returns (FullTokenBalance memory);
    }
}

/// Read-only binding to the adapter registry contract.
pub struct RegistryContract {
    /// Shared RPC provider.
    provider: Arc<ChainProvider>,
    /// Registry contract address from config.
    address: Address,
    /// Upper bound for a single call.
    timeout: Duration,
}

impl RegistryContract {
    /// Bind to the registry and check it has deployed code.
    #[instrument(skip_all)]
    pub async fn new(provider: Arc<ChainProvider>, config: &ChainConfig) -> Result<Self> {
        let address = config.registry_address()?;

        let inner = provider.inner();
        let code = bounded(config.timeout(), "eth_getCode", inner.get_code_at(address))
            .await
            .context("Failed to query registry code")?;

        if code.is_empty() {
            bail!("Registry at {address} has no deployed code, check config.toml");
        }

        info!(registry = %address, "Validated on-chain");

        Ok(Self {
            provider,
            address,
            timeout: config.timeout(),
        })
    }

    /// Encode, `eth_call`, decode.
    async fn call<C: SolCall + Send>(&self, call: C) -> Result<C::Return> {
        let tx = TransactionRequest::default()
            .to(self.address)
            .input(Bytes::from(call.abi_encode()).into());

        let inner = self.provider.inner();
        let output = bounded(self.timeout, C::SIGNATURE, inner.call(&tx)).await?;

        debug!(function = C::SIGNATURE, bytes = output.len(), "Registry call returned");

        C::abi_decode_returns(&output, true)
            .with_context(|| format!("Failed to decode {} return data", C::SIGNATURE))
    }
}

#[async_trait]
impl ChainDataProvider for RegistryContract {
    #[instrument(skip(self))]
    async fn protocol_names(&self) -> Result<Vec<String>> {
        Ok(self
            .call(IAdapterRegistry::getProtocolNamesCall {})
            .await?
            ._0)
    }

    #[instrument(skip(self))]
    async fn protocol_metadata(&self, name: &str) -> Result<RawProtocolMetadata> {
        let call = IAdapterRegistry::getProtocolMetadataCall {
            protocolName: name.to_string(),
        };
        Ok(self.call(call).await?._0.into())
    }

    #[instrument(skip(self), fields(protocols = names.len()))]
    async fn protocol_balances(
        &self,
        owner: Address,
        names: &[String],
    ) -> Result<Vec<RawProtocolBalance>> {
        let call = IAdapterRegistry::getProtocolBalancesCall {
            account: owner,
            protocolNames: names.to_vec(),
        };
        Ok(self.call(call).await?._0.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn all_balances(&self, owner: Address) -> Result<Vec<RawProtocolBalance>> {
        let call = IAdapterRegistry::getBalancesCall { account: owner };
        Ok(self.call(call).await?._0.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn final_full_token_balance(
        &self,
        token_type: &str,
        token: Address,
    ) -> Result<RawFullTokenBalance> {
        let call = IAdapterRegistry::getFinalFullTokenBalanceCall {
            tokenType: token_type.to_string(),
            token,
        };
        Ok(self.call(call).await?._0.into())
    }
}

// ── ABI → raw record mapping ────────────────────────────────

fn amount_digits(amount: U256) -> String {
    amount.to_string()
}

impl From<TokenMetadata> for RawTokenMetadata {
    fn from(meta: TokenMetadata) -> Self {
        Self {
            token: Some(meta.token.to_string()),
            name: Some(meta.name),
            symbol: Some(meta.symbol),
            decimals: Some(meta.decimals.into()),
        }
    }
}

impl From<TokenBalance> for RawTokenBalance {
    fn from(balance: TokenBalance) -> Self {
        Self {
            metadata: Some(balance.metadata.into()),
            amount: Some(amount_digits(balance.amount)),
            underlying: Vec::new(),
        }
    }
}

impl From<FullTokenBalance> for RawFullTokenBalance {
    fn from(full: FullTokenBalance) -> Self {
        Self {
            base: Some(full.base.into()),
            underlying: full.underlying.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<AdapterBalance> for RawAdapterBalance {
    fn from(adapter: AdapterBalance) -> Self {
        Self {
            metadata: Some(RawAdapterMetadata {
                adapter_address: Some(adapter.metadata.adapterAddress.to_string()),
                adapter_type: Some(adapter.metadata.adapterType),
            }),
            balances: adapter.balances.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ProtocolMetadata> for RawProtocolMetadata {
    fn from(meta: ProtocolMetadata) -> Self {
        Self {
            description: Some(meta.description),
            website_url: Some(meta.websiteURL),
            icon_url: Some(meta.iconURL),
            version: Some(version_number(&meta.name, meta.version)),
            name: Some(meta.name),
        }
    }
}

/// Registry versions are small counters; anything wider than `u64` is
/// clamped and logged.
fn version_number(protocol: &str, version: U256) -> u64 {
    u64::try_from(version).unwrap_or_else(|_| {
        warn!(protocol, %version, "Protocol version exceeds u64, clamped");
        u64::MAX
    })
}

impl From<ProtocolBalance> for RawProtocolBalance {
    fn from(protocol: ProtocolBalance) -> Self {
        Self {
            metadata: Some(protocol.metadata.into()),
            adapter_balances: protocol
                .adapterBalances
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}
