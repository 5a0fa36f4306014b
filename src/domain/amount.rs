//! Fixed-point amount normalization.
//!
//! Token balances arrive as unsigned integers in the token's smallest unit.
//! The human value is `raw / 10^decimals`, computed exactly with
//! arbitrary-precision decimals. Floats are never involved: 18-decimal
//! tokens routinely carry more significant digits than an `f64` holds, and
//! `uint256` amounts exceed every fixed-width decimal type.
//!
//! Rendering is canonical (trailing zeros stripped, never exponent
//! notation), so the same `(raw, decimals)` always yields the same string.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};
use serde::{Serialize, Serializer};

use crate::error::BalanceError;

/// Raw on-chain amount in the token's smallest unit. Always non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawAmount(BigUint);

impl RawAmount {
    pub const fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<u128> for RawAmount {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl FromStr for RawAmount {
    type Err = BalanceError;

    /// Parses plain base-10 digits only: no sign, no separators, no
    /// exponent. Surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BalanceError::invalid_amount(s));
        }
        BigUint::parse_bytes(digits.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| BalanceError::invalid_amount(s))
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Power-of-ten scale of a token, as declared by its metadata.
///
/// Bounded by the registry ABI, which encodes decimals as `uint8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Decimals(u8);

impl Decimals {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Decimals {
    type Error = BalanceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| BalanceError::invalid_decimals(value.to_string()))
    }
}

impl From<u8> for Decimals {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Exact human-readable amount: `raw / 10^decimals`.
///
/// Serializes as a decimal string, never as a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedAmount(BigDecimal);

impl fmt::Display for NormalizedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_plain_string())
    }
}

impl Serialize for NormalizedAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Scale a raw amount down by its token decimals.
///
/// Pure and total: every `(amount, decimals)` pair has an exact result.
pub fn normalize(amount: &RawAmount, decimals: Decimals) -> NormalizedAmount {
    let value = BigDecimal::new(
        BigInt::from(amount.as_biguint().clone()),
        i64::from(decimals.get()),
    );
    NormalizedAmount(value.normalized())
}

/// Validate untyped inputs, then [`normalize`].
///
/// # Errors
/// - [`BalanceError::InvalidAmount`] if `amount` is not plain non-negative digits
/// - [`BalanceError::InvalidDecimals`] if `decimals` is negative or above 255
pub fn normalize_raw(amount: &str, decimals: i64) -> Result<NormalizedAmount, BalanceError> {
    let decimals = Decimals::try_from(decimals)?;
    let amount = amount.parse::<RawAmount>()?;
    Ok(normalize(&amount, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str, decimals: i64) -> String {
        normalize_raw(raw, decimals).unwrap().to_string()
    }

    #[test]
    fn test_eighteen_decimals_keep_full_precision() {
        assert_eq!(norm("123456789012345678", 18), "0.123456789012345678");
    }

    #[test]
    fn test_zero_decimals_uses_amount_as_is() {
        assert_eq!(norm("1000", 0), "1000");
        assert_eq!(norm("0", 0), "0");
    }

    #[test]
    fn test_whole_units_drop_trailing_zeros() {
        assert_eq!(norm("1000000000000000000", 18), "1");
        assert_eq!(norm("2500000", 6), "2.5");
        assert_eq!(norm("0", 18), "0");
    }

    #[test]
    fn test_dust_is_rendered_without_exponent() {
        assert_eq!(norm("1", 18), "0.000000000000000001");
    }

    #[test]
    fn test_amounts_beyond_u128() {
        // 2^256 - 1
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(
            norm(max, 18),
            "115792089237316195423570985008687907853269984665640564039457.584007913129639935"
        );
    }

    #[test]
    fn test_negative_decimals_rejected() {
        let err = normalize_raw("1", -1).unwrap_err();
        assert!(matches!(err, BalanceError::InvalidDecimals { ref value, .. } if value == "-1"));
    }

    #[test]
    fn test_decimals_wider_than_uint8_rejected() {
        assert!(matches!(
            normalize_raw("1", 256).unwrap_err(),
            BalanceError::InvalidDecimals { ref value, .. } if value == "256"
        ));
    }

    #[test]
    fn test_malformed_amounts_rejected() {
        for bad in ["", "  ", "-5", "+5", "1.5", "1e18", "0x10", "12_000", "abc"] {
            let err = normalize_raw(bad, 18).unwrap_err();
            assert!(
                matches!(err, BalanceError::InvalidAmount { .. }),
                "{bad:?} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_serializes_as_string() {
        let amount = normalize_raw("1500000", 6).unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"1.5\"");
    }

    #[test]
    fn test_repeated_calls_render_identically() {
        let a = normalize(&RawAmount::from(987_654_321_u128), Decimals::new(4));
        let b = normalize(&RawAmount::from(987_654_321_u128), Decimals::new(4));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "98765.4321");
    }
}
