//! Positions and derivative decomposition.
//!
//! A [`PositionNode`] is one token amount, normalized, together with the
//! tokens it decomposes into. Base tokens have no underlying nodes; a
//! derivative (pool share, wrapped or interest-bearing token) lists its
//! full decomposition at query time.
//!
//! The registry data comes from adapters this client does not control, so
//! recursion is bounded: anything nested deeper than the builder's
//! `max_depth` is cut off, the cut node is flagged `truncated`, and an
//! `ExcessiveRecursionDepth` omission is returned next to the tree.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Serialize, Serializer};

use crate::error::BalanceError;

use super::amount::{Decimals, NormalizedAmount, RawAmount, normalize};
use super::raw::{RawDecimals, RawFullTokenBalance, RawTokenBalance, RawTokenMetadata};

/// Default bound on underlying nesting.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Token identity and scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: Decimals,
    #[serde(serialize_with = "display")]
    pub address: Address,
}

impl AssetMetadata {
    /// Validate raw token metadata.
    ///
    /// Address and decimals are required; name and symbol are descriptive
    /// and default to empty (some tokens expose neither).
    pub fn from_raw(raw: Option<&RawTokenMetadata>) -> Result<Self, BalanceError> {
        let raw = raw.ok_or_else(|| BalanceError::malformed("missing token metadata"))?;

        let token = raw
            .token
            .as_deref()
            .ok_or_else(|| BalanceError::malformed("missing token address"))?;
        let address = Address::from_str(token).map_err(|e| {
            BalanceError::malformed(format!("invalid token address: {e}")).with_token(token)
        })?;
        let token = address.to_string();

        let decimals = match &raw.decimals {
            None => Err(BalanceError::malformed("missing decimals")),
            Some(RawDecimals::Int(value)) => Decimals::try_from(*value),
            Some(RawDecimals::Unparsed(value)) => {
                Err(BalanceError::invalid_decimals(value.as_str()))
            }
        }
        .map_err(|e| e.with_token(&token))?;

        Ok(Self {
            name: raw.name.clone().unwrap_or_default(),
            symbol: raw.symbol.clone().unwrap_or_default(),
            decimals,
            address,
        })
    }
}

/// Normalized token amount and its decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionNode {
    pub metadata: AssetMetadata,
    pub normalized_amount: NormalizedAmount,
    pub underlying: Vec<PositionNode>,
    /// Set when `underlying` was cut at the depth bound.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl PositionNode {
    /// Non-derivative token: nothing underneath and nothing cut off.
    pub fn is_base(&self) -> bool {
        self.underlying.is_empty() && !self.truncated
    }

    /// Number of underlying levels below this node (0 for a base token).
    pub fn depth(&self) -> usize {
        self.underlying
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// True if no node in the tree was truncated.
    pub fn is_complete(&self) -> bool {
        !self.truncated && self.underlying.iter().all(Self::is_complete)
    }
}

/// A built position plus everything that had to be left out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decomposition {
    pub node: PositionNode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub omitted: Vec<BalanceError>,
}

impl Decomposition {
    pub fn is_complete(&self) -> bool {
        self.omitted.is_empty()
    }
}

/// Builds [`PositionNode`] trees from raw balance records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionBuilder {
    max_depth: usize,
}

impl Default for PositionBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl PositionBuilder {
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Build a position from a registry `FullTokenBalance`.
    ///
    /// Underlying entries keep their source order. The base token is level
    /// 0; nodes below level `max_depth` are not built.
    ///
    /// # Errors
    /// Any missing or invalid field anywhere in the tree fails the whole
    /// record (a partial decomposition would misstate the value).
    pub fn build(&self, raw: &RawFullTokenBalance) -> Result<Decomposition, BalanceError> {
        let base = raw
            .base
            .as_ref()
            .ok_or_else(|| BalanceError::malformed("missing base token"))?;

        let mut omitted = Vec::new();
        let node = self.build_node(base, &raw.underlying, 0, &mut omitted)?;
        Ok(Decomposition { node, omitted })
    }

    fn build_node(
        &self,
        balance: &RawTokenBalance,
        underlying: &[RawTokenBalance],
        level: usize,
        omitted: &mut Vec<BalanceError>,
    ) -> Result<PositionNode, BalanceError> {
        let metadata = AssetMetadata::from_raw(balance.metadata.as_ref())?;
        let token = metadata.address.to_string();

        let amount = balance
            .amount
            .as_deref()
            .ok_or_else(|| BalanceError::malformed("missing amount").with_token(&token))?
            .parse::<RawAmount>()
            .map_err(|e| e.with_token(&token))?;
        let normalized_amount = normalize(&amount, metadata.decimals);

        let mut children = Vec::with_capacity(underlying.len());
        let mut truncated = false;
        if !underlying.is_empty() {
            if level >= self.max_depth {
                truncated = true;
                omitted.push(BalanceError::depth_exceeded(self.max_depth).with_token(&token));
            } else {
                for child in underlying {
                    children.push(self.build_node(child, &child.underlying, level + 1, omitted)?);
                }
            }
        }

        Ok(PositionNode {
            metadata,
            normalized_amount,
            underlying: children,
            truncated,
        })
    }
}

fn display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
