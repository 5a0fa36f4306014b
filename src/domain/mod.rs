//! Domain layer - balance normalization and decomposition.
//!
//! Pure logic with no I/O: raw registry records go in, normalized,
//! ordered reports come out. Everything here is testable in isolation.

pub mod amount;
pub mod position;
pub mod raw;
pub mod report;

// Re-export core types for convenience
pub use amount::{Decimals, NormalizedAmount, RawAmount, normalize, normalize_raw};
pub use position::{AssetMetadata, DEFAULT_MAX_DEPTH, Decomposition, PositionBuilder, PositionNode};
pub use raw::{
    RawAdapterBalance, RawAdapterMetadata, RawFullTokenBalance, RawProtocolBalance,
    RawDecimals, RawProtocolMetadata, RawTokenBalance, RawTokenMetadata,
};
pub use report::{
    AdapterBalanceGroup, AdapterType, ProtocolMetadata, ProtocolReport, QueryResult,
    ReportAssembler, ReportStatus,
};
