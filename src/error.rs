//! Error taxonomy for balance normalization and registry queries.
//!
//! Two layers:
//! - [`BalanceError`]: domain failures while turning one raw record into
//!   positions. Cloneable and serializable so a report can carry them as
//!   explicit omission markers.
//! - [`QueryError`]: failures of a façade call as seen by the caller.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Where in a registry response a record failed.
///
/// Filled in progressively: the position builder knows the token, the
/// assembler adds the adapter type and protocol name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl fmt::Display for RecordContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("protocol", &self.protocol),
            ("adapter", &self.adapter_type),
            ("token", &self.token),
        ];
        let mut first = true;
        for (key, value) in fields {
            if let Some(value) = value {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{key}={value}")?;
                first = false;
            }
        }
        if first {
            f.write_str("no context")?;
        }
        Ok(())
    }
}

/// Failure to normalize or decompose a single balance record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum BalanceError {
    /// Amount is not a well-formed non-negative integer.
    #[error("invalid amount {value:?} ({context})")]
    InvalidAmount { value: String, context: RecordContext },

    /// Decimals outside `0..=255` (the ABI's `uint8`).
    #[error("invalid decimals {value} ({context})")]
    InvalidDecimals { value: String, context: RecordContext },

    /// Record is missing a field required to build a position.
    #[error("malformed balance record: {reason} ({context})")]
    MalformedBalanceRecord { reason: String, context: RecordContext },

    /// Underlying decomposition nested deeper than the configured bound.
    #[error("decomposition deeper than {limit} levels was truncated ({context})")]
    ExcessiveRecursionDepth { limit: usize, context: RecordContext },
}

impl BalanceError {
    pub fn invalid_amount(value: impl Into<String>) -> Self {
        Self::InvalidAmount {
            value: value.into(),
            context: RecordContext::default(),
        }
    }

    pub fn invalid_decimals(value: impl Into<String>) -> Self {
        Self::InvalidDecimals {
            value: value.into(),
            context: RecordContext::default(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBalanceRecord {
            reason: reason.into(),
            context: RecordContext::default(),
        }
    }

    pub fn depth_exceeded(limit: usize) -> Self {
        Self::ExcessiveRecursionDepth {
            limit,
            context: RecordContext::default(),
        }
    }

    pub const fn context(&self) -> &RecordContext {
        match self {
            Self::InvalidAmount { context, .. }
            | Self::InvalidDecimals { context, .. }
            | Self::MalformedBalanceRecord { context, .. }
            | Self::ExcessiveRecursionDepth { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut RecordContext {
        match self {
            Self::InvalidAmount { context, .. }
            | Self::InvalidDecimals { context, .. }
            | Self::MalformedBalanceRecord { context, .. }
            | Self::ExcessiveRecursionDepth { context, .. } => context,
        }
    }

    /// Attach the protocol name unless an inner layer already set one.
    #[must_use]
    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.context_mut()
            .protocol
            .get_or_insert_with(|| protocol.to_string());
        self
    }

    #[must_use]
    pub fn with_adapter_type(mut self, adapter_type: &str) -> Self {
        self.context_mut()
            .adapter_type
            .get_or_insert_with(|| adapter_type.to_string());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.context_mut()
            .token
            .get_or_insert_with(|| token.to_string());
        self
    }

    /// Short machine-readable label, used as a log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "InvalidAmount",
            Self::InvalidDecimals { .. } => "InvalidDecimals",
            Self::MalformedBalanceRecord { .. } => "MalformedBalanceRecord",
            Self::ExcessiveRecursionDepth { .. } => "ExcessiveRecursionDepth",
        }
    }
}

/// Failure of a registry façade call.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The registry has no protocol registered under this name.
    #[error("unknown protocol: {name}")]
    UnknownProtocol { name: String },

    /// The chain data provider failed or timed out. Never retried here.
    #[error("chain data provider call {call} failed: {source}")]
    TransportFailure {
        call: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// A single-token decomposition could not be built.
    #[error(transparent)]
    Balance(#[from] BalanceError),
}

impl QueryError {
    pub fn transport(call: &'static str, source: anyhow::Error) -> Self {
        Self::TransportFailure {
            call,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_filled_outward_without_overwriting() {
        let err = BalanceError::malformed("missing decimals")
            .with_token("0xabc")
            .with_adapter_type("Asset")
            .with_protocol("Compound")
            .with_protocol("Other");

        let ctx = err.context();
        assert_eq!(ctx.protocol.as_deref(), Some("Compound"));
        assert_eq!(ctx.adapter_type.as_deref(), Some("Asset"));
        assert_eq!(ctx.token.as_deref(), Some("0xabc"));
        assert_eq!(
            err.to_string(),
            "malformed balance record: missing decimals \
             (protocol=Compound adapter=Asset token=0xabc)"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = BalanceError::depth_exceeded(16).with_token("0xdef");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "ExcessiveRecursionDepth");
        assert_eq!(json["limit"], 16);
        assert_eq!(json["context"]["token"], "0xdef");
        assert!(json["context"].get("protocol").is_none());
    }

    #[test]
    fn test_transport_failure_keeps_source_message() {
        let err = QueryError::transport("getProtocolNames", anyhow::anyhow!("timed out"));
        assert_eq!(
            err.to_string(),
            "chain data provider call getProtocolNames failed: timed out"
        );
    }
}
