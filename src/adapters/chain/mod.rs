//! Chain Adapters - Adapter Registry Access Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider management (transport chosen by URL)
//! - Adapter registry read calls (protocol names, metadata, balances,
//!   token decomposition)

pub mod provider;
pub mod registry;

pub use provider::ChainProvider;
pub use registry::RegistryContract;
