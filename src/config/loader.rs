//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)
    .with_context(|| format!("Invalid configuration in {}", path.display()))?;

  info!(
    rpc_url = %config.chain.rpc_url,
    registry = %config.chain.registry_address,
    max_depth = config.decomposition.max_depth,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config TOML")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A non-empty RPC endpoint and a positive timeout
/// - Parseable registry, owner and token addresses
/// - A usable decomposition depth
fn validate_config(config: &AppConfig) -> Result<()> {
  // Chain validation
  anyhow::ensure!(
    !config.chain.rpc_url.trim().is_empty(),
    "chain.rpc_url must not be empty"
  );
  anyhow::ensure!(
    config.chain.timeout_seconds > 0,
    "chain.timeout_seconds must be positive"
  );
  config.chain.registry_address()?;

  // Decomposition validation
  anyhow::ensure!(
    config.decomposition.max_depth >= 1,
    "decomposition.max_depth must be at least 1, got {}",
    config.decomposition.max_depth
  );

  // Query validation
  config.query.owner()?;
  for (i, token) in config.query.tokens.iter().enumerate() {
    anyhow::ensure!(
      !token.label.trim().is_empty(),
      "Token {} ({}) has empty label",
      i,
      token.address
    );
    token.address()?;
  }
  for name in config.query.protocols.iter().chain(&config.query.metadata) {
    anyhow::ensure!(!name.trim().is_empty(), "Protocol names must not be empty");
  }

  Ok(())
}
