//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the reader's workflows.
//!
//! Use cases:
//! - `RegistryQuery`: protocol listing, metadata, balances and token
//!   decomposition against the adapter registry

pub mod registry_query;

pub use registry_query::RegistryQuery;
