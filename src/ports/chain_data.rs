//! Chain Data Provider Port - Registry Read Interface
//!
//! Defines the trait the query façade needs from the outside world:
//! the read-only calls of the on-chain adapter registry, already
//! ABI-decoded into lenient raw records.
//!
//! Implementations own transport, timeouts and any retry policy. Calls
//! must be side-effect free and safe to issue concurrently.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::domain::raw::{RawFullTokenBalance, RawProtocolBalance, RawProtocolMetadata};

/// Trait for read-only access to the adapter registry contract.
#[async_trait]
pub trait ChainDataProvider: Send + Sync + 'static {
  /// `getProtocolNames()`: every registered protocol, in registry order.
  async fn protocol_names(&self) -> anyhow::Result<Vec<String>>;

  /// `getProtocolMetadata(name)`.
  ///
  /// The registry answers unknown names with an empty struct rather
  /// than a revert; callers decide what an empty name means.
  async fn protocol_metadata(&self, name: &str) -> anyhow::Result<RawProtocolMetadata>;

  /// `getProtocolBalances(owner, names)`: one atomic read for the set.
  async fn protocol_balances(
    &self,
    owner: Address,
    names: &[String],
  ) -> anyhow::Result<Vec<RawProtocolBalance>>;

  /// `getBalances(owner)`: balances across all registered protocols.
  async fn all_balances(&self, owner: Address) -> anyhow::Result<Vec<RawProtocolBalance>>;

  /// `getFinalFullTokenBalance(tokenType, token)`: decomposition of one
  /// unit of `token`, independent of any holder.
  async fn final_full_token_balance(
    &self,
    token_type: &str,
    token: Address,
  ) -> anyhow::Result<RawFullTokenBalance>;
}
