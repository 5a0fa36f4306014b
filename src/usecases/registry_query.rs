//! Registry Query Use Case - Read, Normalize, Assemble
//!
//! The façade over the `ChainDataProvider` port. Each operation is one
//! pass-through call followed by domain assembly; nothing is cached and
//! no state survives between calls, so any number of queries may run
//! concurrently against the same instance.
//!
//! Provider failures become `TransportFailure` and are not retried.
//! Omitted or failed records are logged here with their full context.

use std::sync::Arc;

use alloy::primitives::Address;
use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::config::DecompositionConfig;
use crate::domain::position::{Decomposition, PositionBuilder};
use crate::domain::report::{ProtocolMetadata, QueryResult, ReportAssembler, ReportStatus};
use crate::error::QueryError;
use crate::ports::chain_data::ChainDataProvider;

/// Read-only façade over the adapter registry.
pub struct RegistryQuery<P: ChainDataProvider> {
  chain: Arc<P>,
  assembler: ReportAssembler,
}

impl<P: ChainDataProvider> RegistryQuery<P> {
  /// Create a façade with explicit decomposition settings.
  pub fn new(chain: Arc<P>, config: &DecompositionConfig) -> Self {
    let assembler = ReportAssembler::new(PositionBuilder::new(config.max_depth))
      .include_empty(config.include_empty);
    Self { chain, assembler }
  }

  /// Names of all registered protocols, in registry order.
  #[instrument(skip(self))]
  pub async fn list_protocol_names(&self) -> Result<Vec<String>, QueryError> {
    let names = self
      .chain
      .protocol_names()
      .await
      .map_err(|e| QueryError::transport("getProtocolNames", e))?;

    debug!(count = names.len(), "Protocol names fetched");
    Ok(names)
  }

  /// Metadata of one protocol.
  ///
  /// # Errors
  /// `UnknownProtocol` if the registry returns an empty record for `name`.
  #[instrument(skip(self))]
  pub async fn protocol_metadata(&self, name: &str) -> Result<ProtocolMetadata, QueryError> {
    let raw = self
      .chain
      .protocol_metadata(name)
      .await
      .map_err(|e| QueryError::transport("getProtocolMetadata", e))?;

    if raw.name.as_deref().is_none_or(str::is_empty) {
      return Err(QueryError::UnknownProtocol {
        name: name.to_string(),
      });
    }

    Ok(ProtocolMetadata::from_raw(Some(&raw))?)
  }

  /// Metadata of several protocols, fetched concurrently.
  ///
  /// Results keep the order of `names`; one failure does not affect the
  /// others.
  pub async fn describe_protocols(
    &self,
    names: &[String],
  ) -> Vec<(String, Result<ProtocolMetadata, QueryError>)> {
    let lookups = names.iter().map(|name| async move {
      (name.clone(), self.protocol_metadata(name).await)
    });
    join_all(lookups).await
  }

  /// Balances of `owner`, restricted to `names` (all protocols if empty).
  ///
  /// A protocol with a malformed record comes back as a `Failed` report;
  /// the rest of the result is unaffected.
  #[instrument(skip(self, names), fields(owner = %owner, requested = names.len()))]
  pub async fn protocol_balances(
    &self,
    owner: Address,
    names: &[String],
  ) -> Result<QueryResult, QueryError> {
    let raw = if names.is_empty() {
      self
        .chain
        .all_balances(owner)
        .await
        .map_err(|e| QueryError::transport("getBalances", e))?
    } else {
      self
        .chain
        .protocol_balances(owner, names)
        .await
        .map_err(|e| QueryError::transport("getProtocolBalances", e))?
    };

    let result = self.assembler.assemble(&raw);
    log_omissions(&result);

    info!(
      received = raw.len(),
      reported = result.len(),
      failed = result.iter().filter(|r| r.is_failed()).count(),
      "Protocol balances assembled"
    );

    Ok(result)
  }

  /// Decompose one token without reference to any holder.
  ///
  /// # Errors
  /// `Balance` if the registry's record for the token is malformed.
  #[instrument(skip(self))]
  pub async fn decompose_token(
    &self,
    token_type: &str,
    token: Address,
  ) -> Result<Decomposition, QueryError> {
    let raw = self
      .chain
      .final_full_token_balance(token_type, token)
      .await
      .map_err(|e| QueryError::transport("getFinalFullTokenBalance", e))?;

    let token_label = token.to_string();
    let decomposition = self
      .assembler
      .builder()
      .build(&raw)
      .map_err(|e| e.with_token(&token_label))?;

    for error in &decomposition.omitted {
      warn!(token = %token, kind = error.kind(), error = %error, "Decomposition truncated");
    }

    Ok(decomposition)
  }
}

fn log_omissions(result: &QueryResult) {
  for report in result {
    match &report.status {
      ReportStatus::Complete => {}
      ReportStatus::Incomplete { omitted } => {
        for error in omitted {
          let ctx = error.context();
          warn!(
            protocol = %report.metadata.name,
            adapter_type = ctx.adapter_type.as_deref().unwrap_or_default(),
            token = ctx.token.as_deref().unwrap_or_default(),
            kind = error.kind(),
            "Position decomposition truncated"
          );
        }
      }
      ReportStatus::Failed { error } => {
        let ctx = error.context();
        warn!(
          protocol = %report.metadata.name,
          adapter_type = ctx.adapter_type.as_deref().unwrap_or_default(),
          token = ctx.token.as_deref().unwrap_or_default(),
          kind = error.kind(),
          error = %error,
          "Protocol report omitted"
        );
      }
    }
  }
}
