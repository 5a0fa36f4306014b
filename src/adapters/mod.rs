//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies, and renders results for the console.
//!
//! Adapter categories:
//! - `chain`: adapter registry access via alloy-rs
//! - `output`: JSON and text rendering of reports

pub mod chain;
pub mod output;
