//! Configuration Module - TOML-based Reader Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! The RPC endpoint, registry address and query targets are
//! externalized here - nothing chain-specific is hardcoded in the
//! domain layer.

pub mod loader;

use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::position::DEFAULT_MAX_DEPTH;

/// Adapter registry deployment on Ethereum mainnet.
pub const REGISTRY_ADDRESS: &str = "0x06FE76B2f432fdfEcAEf1a7d4f6C3d41B5861672";

/// Top-level configuration.
///
/// Loaded from `config.toml` at startup and validated before any
/// chain call is issued.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Identity, logging and output.
  #[serde(default)]
  pub app: AppSection,
  /// Chain data provider connection.
  pub chain: ChainConfig,
  /// Decomposition and assembly settings.
  #[serde(default)]
  pub decomposition: DecompositionConfig,
  /// What to query on this run.
  #[serde(default)]
  pub query: QueryConfig,
}

/// Identity and presentation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  /// Human-readable name used in logs.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Report format written to stdout.
  #[serde(default)]
  pub output: OutputFormat,
}

impl Default for AppSection {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
      output: OutputFormat::default(),
    }
  }
}

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
  /// Pretty-printed JSON, amounts as decimal strings.
  #[default]
  Json,
  /// Console listing, one line per position.
  Text,
}

/// Chain data provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// RPC endpoint. The scheme picks the transport (http(s), ws(s), ipc path).
  pub rpc_url: String,
  /// Adapter registry contract.
  #[serde(default = "default_registry_address")]
  pub registry_address: String,
  /// Refuse to start if the endpoint reports another chain.
  pub expected_chain_id: Option<u64>,
  /// Per-call timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
}

impl ChainConfig {
  /// Parsed registry address.
  pub fn registry_address(&self) -> Result<Address> {
    self
      .registry_address
      .parse()
      .with_context(|| format!("Invalid registry address: {}", self.registry_address))
  }

  pub const fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }
}

/// Settings handed to the query façade at construction.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DecompositionConfig {
  /// Deepest underlying level that is still decomposed.
  #[serde(default = "default_max_depth")]
  pub max_depth: usize,
  /// Report protocols and adapters that hold no balances.
  #[serde(default)]
  pub include_empty: bool,
}

impl Default for DecompositionConfig {
  fn default() -> Self {
    Self {
      max_depth: default_max_depth(),
      include_empty: false,
    }
  }
}

/// Query targets for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
  /// Print the registered protocol names.
  #[serde(default = "default_true")]
  pub list_protocols: bool,
  /// Protocols whose metadata should be shown.
  #[serde(default)]
  pub metadata: Vec<String>,
  /// Account whose balances are read. No balance query if unset.
  pub owner: Option<String>,
  /// Protocols to read balances from; empty means all.
  #[serde(default)]
  pub protocols: Vec<String>,
  /// Tokens to decompose independently of any holder.
  #[serde(default)]
  pub tokens: Vec<TokenQuery>,
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      list_protocols: true,
      metadata: Vec::new(),
      owner: None,
      protocols: Vec::new(),
      tokens: Vec::new(),
    }
  }
}

impl QueryConfig {
  /// Parsed owner address, if configured.
  pub fn owner(&self) -> Result<Option<Address>> {
    self
      .owner
      .as_deref()
      .map(|owner| {
        owner
          .parse()
          .with_context(|| format!("Invalid owner address: {owner}"))
      })
      .transpose()
  }
}

/// A token to decompose.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenQuery {
  /// Registry token type, e.g. "Uniswap V1 pool token".
  pub label: String,
  /// Token contract address.
  pub address: String,
}

impl TokenQuery {
  pub fn address(&self) -> Result<Address> {
    self
      .address
      .parse()
      .with_context(|| format!("Invalid token address for {}: {}", self.label, self.address))
  }
}

// Default value functions for serde

fn default_name() -> String {
  "defi-registry-reader".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_registry_address() -> String {
  REGISTRY_ADDRESS.to_string()
}

const fn default_timeout() -> u64 {
  30
}

const fn default_max_depth() -> usize {
  DEFAULT_MAX_DEPTH
}

const fn default_true() -> bool {
  true
}
