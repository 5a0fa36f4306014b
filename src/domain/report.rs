//! Protocol reports: registry balances grouped by protocol and adapter.
//!
//! The assembler keeps registry order everywhere (protocols, adapters,
//! balances). Failures are isolated per protocol: one protocol with a
//! malformed record yields a `Failed` report while the others are still
//! assembled normally.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Serialize, Serializer};

use crate::error::BalanceError;

use super::position::{PositionBuilder, PositionNode};
use super::raw::{RawAdapterBalance, RawProtocolBalance, RawProtocolMetadata};

/// Registry-provided description of a protocol. Identity key: `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMetadata {
    pub name: String,
    pub description: String,
    #[serde(rename = "websiteURL")]
    pub website_url: String,
    #[serde(rename = "iconURL")]
    pub icon_url: String,
    pub version: u64,
}

impl ProtocolMetadata {
    /// Only `name` is required; descriptive fields default to empty.
    pub fn from_raw(raw: Option<&RawProtocolMetadata>) -> Result<Self, BalanceError> {
        let raw = raw.ok_or_else(|| BalanceError::malformed("missing protocol metadata"))?;
        let name = raw
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| BalanceError::malformed("protocol metadata has no name"))?;

        Ok(Self {
            name,
            description: raw.description.clone().unwrap_or_default(),
            website_url: raw.website_url.clone().unwrap_or_default(),
            icon_url: raw.icon_url.clone().unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
        })
    }
}

/// Balance classification of an adapter.
///
/// Values other than `Asset` and `Debt` are kept verbatim in `Other` so a
/// new registry classification never breaks a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdapterType {
    Asset,
    Debt,
    Other(String),
}

impl AdapterType {
    pub fn classify(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asset") {
            Self::Asset
        } else if value.eq_ignore_ascii_case("debt") {
            Self::Debt
        } else {
            Self::Other(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Asset => "Asset",
            Self::Debt => "Debt",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for AdapterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AdapterType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Positions reported by one adapter of a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterBalanceGroup {
    pub adapter_type: AdapterType,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "display_opt"
    )]
    pub adapter_address: Option<Address>,
    pub balances: Vec<PositionNode>,
}

/// How much of a protocol's data made it into its report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ReportStatus {
    Complete,
    /// Some decompositions were cut at the depth bound.
    Incomplete { omitted: Vec<BalanceError> },
    /// A record was unusable; no balances are reported for this protocol.
    Failed { error: BalanceError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolReport {
    pub metadata: ProtocolMetadata,
    pub adapter_balances: Vec<AdapterBalanceGroup>,
    pub status: ReportStatus,
}

impl ProtocolReport {
    pub const fn is_complete(&self) -> bool {
        matches!(self.status, ReportStatus::Complete)
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self.status, ReportStatus::Failed { .. })
    }

    /// Every error recorded against this report.
    pub fn omissions(&self) -> Vec<&BalanceError> {
        match &self.status {
            ReportStatus::Complete => Vec::new(),
            ReportStatus::Incomplete { omitted } => omitted.iter().collect(),
            ReportStatus::Failed { error } => vec![error],
        }
    }

    fn failed(metadata: ProtocolMetadata, error: BalanceError) -> Self {
        Self {
            metadata,
            adapter_balances: Vec::new(),
            status: ReportStatus::Failed { error },
        }
    }
}

/// Ordered reports, one per protocol the registry answered for.
pub type QueryResult = Vec<ProtocolReport>;

/// Turns raw `ProtocolBalance[]` responses into [`QueryResult`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAssembler {
    builder: PositionBuilder,
    include_empty: bool,
}

impl ReportAssembler {
    pub const fn new(builder: PositionBuilder) -> Self {
        Self {
            builder,
            include_empty: false,
        }
    }

    /// Keep protocols and adapters that report no balances.
    #[must_use]
    pub const fn include_empty(mut self, include: bool) -> Self {
        self.include_empty = include;
        self
    }

    pub const fn builder(&self) -> &PositionBuilder {
        &self.builder
    }

    /// Assemble reports in registry order.
    ///
    /// Protocols with no balances at all are skipped unless
    /// `include_empty` is set.
    pub fn assemble(&self, raw: &[RawProtocolBalance]) -> QueryResult {
        raw.iter()
            .filter(|protocol| self.include_empty || !protocol.is_empty())
            .map(|protocol| self.assemble_protocol(protocol))
            .collect()
    }

    /// Assemble a single protocol; never fails, errors land in `status`.
    pub fn assemble_protocol(&self, raw: &RawProtocolBalance) -> ProtocolReport {
        let metadata = match ProtocolMetadata::from_raw(raw.metadata.as_ref()) {
            Ok(metadata) => metadata,
            Err(error) => {
                let metadata = ProtocolMetadata {
                    name: raw.name().unwrap_or_default().to_string(),
                    ..ProtocolMetadata::default()
                };
                return ProtocolReport::failed(metadata, error);
            }
        };

        let mut groups = Vec::with_capacity(raw.adapter_balances.len());
        let mut omitted = Vec::new();
        for adapter in &raw.adapter_balances {
            if !self.include_empty && adapter.balances.is_empty() {
                continue;
            }
            match self.assemble_adapter(adapter, &mut omitted) {
                Ok(group) => groups.push(group),
                Err(error) => {
                    let error = error.with_protocol(&metadata.name);
                    return ProtocolReport::failed(metadata, error);
                }
            }
        }

        let status = if omitted.is_empty() {
            ReportStatus::Complete
        } else {
            ReportStatus::Incomplete {
                omitted: omitted
                    .into_iter()
                    .map(|e| e.with_protocol(&metadata.name))
                    .collect(),
            }
        };

        ProtocolReport {
            metadata,
            adapter_balances: groups,
            status,
        }
    }

    fn assemble_adapter(
        &self,
        raw: &RawAdapterBalance,
        omitted: &mut Vec<BalanceError>,
    ) -> Result<AdapterBalanceGroup, BalanceError> {
        let meta = raw
            .metadata
            .as_ref()
            .ok_or_else(|| BalanceError::malformed("missing adapter metadata"))?;
        let adapter_type = meta
            .adapter_type
            .as_deref()
            .map(AdapterType::classify)
            .ok_or_else(|| BalanceError::malformed("missing adapter type"))?;
        let type_label = adapter_type.to_string();

        let adapter_address = meta
            .adapter_address
            .as_deref()
            .map(Address::from_str)
            .transpose()
            .map_err(|e| {
                BalanceError::malformed(format!("invalid adapter address: {e}"))
                    .with_adapter_type(&type_label)
            })?;

        let mut balances = Vec::with_capacity(raw.balances.len());
        for balance in &raw.balances {
            let built = self
                .builder
                .build(balance)
                .map_err(|e| e.with_adapter_type(&type_label))?;
            omitted.extend(
                built
                    .omitted
                    .into_iter()
                    .map(|e| e.with_adapter_type(&type_label)),
            );
            balances.push(built.node);
        }

        Ok(AdapterBalanceGroup {
            adapter_type,
            adapter_address,
            balances,
        })
    }
}

#[allow(clippy::ref_option)]
fn display_opt<S: Serializer>(value: &Option<Address>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(address) => serializer.collect_str(address),
        None => serializer.serialize_none(),
    }
}
