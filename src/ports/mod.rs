//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ChainDataProvider`: read-only calls against the adapter registry

pub mod chain_data;

pub use chain_data::ChainDataProvider;
