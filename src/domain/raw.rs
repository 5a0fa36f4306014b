//! Raw registry records, exactly as the chain data provider hands them over.
//!
//! Every field is optional and unknown fields are ignored: the registry can
//! grow its structs, and a broken adapter can return half-filled ones. Whether
//! a record is usable is decided later by the position builder, where a
//! missing field becomes a `MalformedBalanceRecord` instead of a decode
//! failure for the whole response. Amounts and decimals accept any JSON
//! value for the same reason: a negative or fractional amount surfaces as
//! `InvalidAmount` on its own protocol.
//!
//! Field names follow the registry ABI (`websiteURL`, `adapterBalances`, ...)
//! so JSON captured from the contract deserializes as-is.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawProtocolMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "websiteURL")]
    pub website_url: Option<String>,
    #[serde(rename = "iconURL")]
    pub icon_url: Option<String>,
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTokenMetadata {
    /// Token contract address, hex encoded.
    pub token: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    #[serde(deserialize_with = "decimals_repr")]
    pub decimals: Option<RawDecimals>,
}

/// Declared decimals as received.
///
/// Anything that is not an integer is kept verbatim in `Unparsed` so it can
/// be reported as `InvalidDecimals`. Integers stay signed so a negative value
/// is reported, not truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawDecimals {
    Int(i64),
    Unparsed(String),
}

impl From<i64> for RawDecimals {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u8> for RawDecimals {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

/// One token amount, optionally decomposed further.
///
/// The registry ABI only nests one level (`FullTokenBalance.underlying`),
/// but `underlying` here may recurse for derivatives of derivatives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTokenBalance {
    pub metadata: Option<RawTokenMetadata>,
    /// Base-10 integer in the token's smallest unit.
    #[serde(deserialize_with = "amount_repr")]
    pub amount: Option<String>,
    pub underlying: Vec<RawTokenBalance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawFullTokenBalance {
    pub base: Option<RawTokenBalance>,
    pub underlying: Vec<RawTokenBalance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAdapterMetadata {
    pub adapter_address: Option<String>,
    /// "Asset" or "Debt" today; other values pass through.
    pub adapter_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAdapterBalance {
    pub metadata: Option<RawAdapterMetadata>,
    pub balances: Vec<RawFullTokenBalance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawProtocolBalance {
    pub metadata: Option<RawProtocolMetadata>,
    pub adapter_balances: Vec<RawAdapterBalance>,
}

impl RawProtocolBalance {
    /// Protocol name if present, for log fields and error context.
    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.name.as_deref())
    }

    /// True if no adapter reported a single balance for the owner.
    pub fn is_empty(&self) -> bool {
        self.adapter_balances.iter().all(|a| a.balances.is_empty())
    }
}

/// Amounts may be captured as JSON strings or numbers. Any other value is
/// kept as its JSON text and rejected when the amount is parsed.
fn amount_repr<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.map(|value| match value {
        Value::String(s) => s,
        other => other.to_string(),
    }))
}

fn decimals_repr<'de, D>(deserializer: D) -> Result<Option<RawDecimals>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.map(|value| match value {
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| RawDecimals::Unparsed(n.to_string()), RawDecimals::Int),
        Value::String(s) => s.trim().parse().map_or(RawDecimals::Unparsed(s), RawDecimals::Int),
        other => RawDecimals::Unparsed(other.to_string()),
    }))
}
