//! Report Output - JSON and Console Rendering
//!
//! Collects the results of one run into a [`RunReport`] and renders it
//! either as pretty JSON (amounts as decimal strings, registry order kept)
//! or as a console listing, one line per position with its components
//! indented underneath.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::OutputFormat;
use crate::domain::{Decomposition, PositionNode, ProtocolMetadata, ProtocolReport, ReportStatus};

const SEPARATOR: &str = "___________________________";

/// Everything one run queried, in the order it was configured.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balances: Option<OwnerBalances>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenEntry>,
}

impl RunReport {
    pub fn new(chain_id: u64) -> Self {
        Self {
            generated_at: Utc::now(),
            chain_id,
            protocol_names: None,
            metadata: Vec::new(),
            balances: None,
            tokens: Vec::new(),
        }
    }
}

/// Metadata lookup for one requested protocol name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    pub requested: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProtocolMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Balances of one account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerBalances {
    pub owner: String,
    pub protocols: Vec<ProtocolReport>,
}

/// Decomposition of one configured token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub label: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decomposition: Option<Decomposition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Render a run in the configured format.
pub fn render(report: &RunReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize report")
        }
        OutputFormat::Text => Ok(TextReport(report).to_string()),
    }
}

/// Console listing of a [`RunReport`].
pub struct TextReport<'a>(pub &'a RunReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;

        if let Some(names) = &report.protocol_names {
            writeln!(f, "Available adapters: {}", names.join(", "))?;
            writeln!(f, "{SEPARATOR}")?;
        }

        for entry in &report.metadata {
            match (&entry.metadata, &entry.error) {
                (Some(meta), _) => write_metadata(f, meta)?,
                (None, Some(error)) => writeln!(f, "Protocol {}: {error}", entry.requested)?,
                (None, None) => writeln!(f, "Protocol {}: no data", entry.requested)?,
            }
            writeln!(f, "{SEPARATOR}")?;
        }

        if let Some(balances) = &report.balances {
            writeln!(f, "Owner: {}", balances.owner)?;
            for protocol in &balances.protocols {
                write_protocol(f, protocol)?;
                writeln!(f, "{SEPARATOR}")?;
            }
        }

        for token in &report.tokens {
            write_token(f, token)?;
        }

        Ok(())
    }
}

fn write_metadata(f: &mut fmt::Formatter<'_>, meta: &ProtocolMetadata) -> fmt::Result {
    writeln!(f, "Protocol: {}", meta.name)?;
    writeln!(f, "  Description: {}", meta.description)?;
    writeln!(f, "  Website: {}", meta.website_url)?;
    writeln!(f, "  Logo: {}", meta.icon_url)?;
    writeln!(f, "  Version: {}", meta.version)
}

fn write_protocol(f: &mut fmt::Formatter<'_>, report: &ProtocolReport) -> fmt::Result {
    writeln!(f, "Protocol: {}", report.metadata.name)?;
    for group in &report.adapter_balances {
        writeln!(f, "Balance type: {}", group.adapter_type)?;
        for node in &group.balances {
            write!(f, "Position: ")?;
            write_node(f, node, 0)?;
        }
    }
    match &report.status {
        ReportStatus::Complete => Ok(()),
        ReportStatus::Incomplete { omitted } => {
            for error in omitted {
                writeln!(f, "  incomplete: {error}")?;
            }
            Ok(())
        }
        ReportStatus::Failed { error } => writeln!(f, "  failed: {error}"),
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &PositionNode, level: usize) -> fmt::Result {
    writeln!(
        f,
        "{} {} ({})",
        node.metadata.name, node.normalized_amount, node.metadata.symbol
    )?;
    for child in &node.underlying {
        write!(f, "{:indent$}Component: ", "", indent = (level + 1) * 2)?;
        write_node(f, child, level + 1)?;
    }
    if node.truncated {
        writeln!(f, "{:indent$}...", "", indent = (level + 1) * 2)?;
    }
    Ok(())
}

fn write_token(f: &mut fmt::Formatter<'_>, token: &TokenEntry) -> fmt::Result {
    let Some(decomposition) = &token.decomposition else {
        let error = token.error.as_deref().unwrap_or("no data");
        return writeln!(f, "Token {} ({}): {error}", token.label, token.address);
    };

    let node = &decomposition.node;
    writeln!(f, "Token {}", node.metadata.name)?;
    if node.is_base() {
        writeln!(f, "Is base token")?;
    } else {
        writeln!(f, "Consists of")?;
        for child in &node.underlying {
            write!(f, "  Component: ")?;
            write_node(f, child, 1)?;
        }
        if node.truncated {
            writeln!(f, "  ...")?;
        }
    }
    for error in &decomposition.omitted {
        writeln!(f, "  incomplete: {error}")?;
    }
    Ok(())
}
