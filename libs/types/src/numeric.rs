//! Fixed-point arithmetic for amounts, basis points and yield indexes
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Amounts carry `AMOUNT_DP` fractional digits. Anything the ledger pays out
//! rounds toward zero; anything it pulls in rounds away from zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fractional digits kept on every asset, share and claim-token amount.
pub const AMOUNT_DP: u32 = 18;

/// Fractional digits of a per-token yield index (`SCALE = 10^INDEX_DP`).
pub const INDEX_DP: u32 = 18;

/// Fixed-point scale of `YieldIndex`.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// 10 000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// 365-day year used for APY accrual.
pub const SECONDS_PER_YEAR: i64 = 31_536_000;

/// Arithmetic failures surfaced by checked helpers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Negative value where a non-negative amount is required: {value}")]
    Negative { value: String },
}

/// Round an amount down to `AMOUNT_DP` digits.
pub fn round_down(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::ToZero)
}

/// Round an amount up to `AMOUNT_DP` digits.
pub fn round_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::AwayFromZero)
}

/// `amount * numerator / denominator`, rounded down.
pub fn mul_div_down(
    amount: Decimal,
    numerator: Decimal,
    denominator: Decimal,
) -> Result<Decimal, NumericError> {
    mul_div(amount, numerator, denominator).map(round_down)
}

/// `amount * numerator / denominator`, rounded up.
pub fn mul_div_up(
    amount: Decimal,
    numerator: Decimal,
    denominator: Decimal,
) -> Result<Decimal, NumericError> {
    mul_div(amount, numerator, denominator).map(round_up)
}

fn mul_div(
    amount: Decimal,
    numerator: Decimal,
    denominator: Decimal,
) -> Result<Decimal, NumericError> {
    if denominator.is_zero() {
        return Err(NumericError::DivisionByZero);
    }
    amount
        .checked_mul(numerator)
        .and_then(|product| product.checked_div(denominator))
        .ok_or(NumericError::Overflow)
}

/// Share of `part` in `whole`, expressed in (fractional) basis points.
///
/// Returns zero when `whole` is zero.
pub fn ratio_bps(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part * Decimal::from(BPS_DENOMINATOR) / whole
}

/// Basis points. Fractions (weights, thresholds, fees) are at most 10 000;
/// rates such as APY may exceed it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Bps(u32);

impl Bps {
    pub const ZERO: Bps = Bps(0);
    pub const MAX_FRACTION: Bps = Bps(BPS_DENOMINATOR);

    /// Create a rate in basis points (unbounded).
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Create a fraction, returning None above 10 000.
    pub fn try_fraction(value: u32) -> Option<Self> {
        if value <= BPS_DENOMINATOR {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_fraction(&self) -> bool {
        self.0 <= BPS_DENOMINATOR
    }

    /// The rate as a plain decimal (500 bps -> 0.05).
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(BPS_DENOMINATOR)
    }

    /// `amount * self / 10 000`, rounded down.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        round_down(amount * Decimal::from(self.0) / Decimal::from(BPS_DENOMINATOR))
    }

    pub fn checked_add(self, other: Bps) -> Option<Bps> {
        self.0.checked_add(other.0).map(Bps)
    }

    pub fn saturating_sub(self, other: Bps) -> Bps {
        Bps(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

/// Cumulative yield per token, a fixed-point integer scaled by `SCALE`.
///
/// Only ever grows; overflow is reported rather than wrapped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct YieldIndex(u128);

impl YieldIndex {
    pub const ZERO: YieldIndex = YieldIndex(0);

    pub fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw scaled value (`yield per token * SCALE`).
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Index increment for spreading `amount` over `supply` tokens:
    /// `floor(amount * SCALE / supply)`.
    pub fn per_token(amount: Decimal, supply: Decimal) -> Result<Self, NumericError> {
        if amount.is_sign_negative() {
            return Err(NumericError::Negative {
                value: amount.to_string(),
            });
        }
        if supply <= Decimal::ZERO {
            return Err(NumericError::DivisionByZero);
        }
        let per_token = amount
            .checked_div(supply)
            .ok_or(NumericError::Overflow)?
            .round_dp_with_strategy(INDEX_DP, RoundingStrategy::ToZero);
        let scaled = per_token
            .checked_mul(Decimal::from(SCALE as u64))
            .ok_or(NumericError::Overflow)?
            .trunc();
        scaled
            .to_u128()
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    pub fn checked_add(self, other: YieldIndex) -> Result<Self, NumericError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    /// The index as a decimal yield-per-token.
    pub fn as_decimal(&self) -> Result<Decimal, NumericError> {
        let raw = i128::try_from(self.0).map_err(|_| NumericError::Overflow)?;
        Decimal::try_from_i128_with_scale(raw, INDEX_DP).map_err(|_| NumericError::Overflow)
    }

    /// `balance * index / SCALE`, rounded down.
    pub fn accrued_on(&self, balance: Decimal) -> Result<Decimal, NumericError> {
        let per_token = self.as_decimal()?;
        balance
            .checked_mul(per_token)
            .map(round_down)
            .ok_or(NumericError::Overflow)
    }
}

impl fmt::Display for YieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_down_and_up() {
        let v = Decimal::from_str_exact("1.0000000000000000005").unwrap();
        assert_eq!(round_down(v), Decimal::ONE);
        assert_eq!(
            round_up(v),
            Decimal::from_str_exact("1.000000000000000001").unwrap()
        );
    }

    #[test]
    fn test_mul_div_down() {
        let r = mul_div_down(Decimal::from(1000), Decimal::from(4000), Decimal::from(10_000))
            .unwrap();
        assert_eq!(r, Decimal::from(400));
    }

    #[test]
    fn test_mul_div_by_zero() {
        let r = mul_div_down(Decimal::ONE, Decimal::ONE, Decimal::ZERO);
        assert_eq!(r, Err(NumericError::DivisionByZero));
    }

    #[test]
    fn test_mul_div_up_rounds_away() {
        let r = mul_div_up(Decimal::ONE, Decimal::ONE, Decimal::from(3)).unwrap();
        assert!(r * Decimal::from(3) >= Decimal::ONE);
    }

    #[test]
    fn test_bps_apply() {
        assert_eq!(Bps::new(3500).apply(Decimal::from(1000)), Decimal::from(350));
        assert_eq!(Bps::ZERO.apply(Decimal::from(1000)), Decimal::ZERO);
    }

    #[test]
    fn test_bps_fraction_bounds() {
        assert!(Bps::try_fraction(10_000).is_some());
        assert!(Bps::try_fraction(10_001).is_none());
        assert!(Bps::new(25_000).value() > BPS_DENOMINATOR);
    }

    #[test]
    fn test_bps_as_decimal() {
        assert_eq!(Bps::new(500).as_decimal(), Decimal::from_str_exact("0.05").unwrap());
    }

    #[test]
    fn test_ratio_bps() {
        assert_eq!(ratio_bps(Decimal::from(25), Decimal::from(100)), Decimal::from(2500));
        assert_eq!(ratio_bps(Decimal::from(25), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_yield_index_per_token() {
        // 100 units over 1000 tokens -> 100 * SCALE / 1000
        let idx = YieldIndex::per_token(Decimal::from(100), Decimal::from(1000)).unwrap();
        assert_eq!(idx.raw(), 100 * SCALE / 1000);
        assert_eq!(idx.accrued_on(Decimal::from(200)).unwrap(), Decimal::from(20));
    }

    #[test]
    fn test_yield_index_rounds_down() {
        let idx = YieldIndex::per_token(Decimal::ONE, Decimal::from(3)).unwrap();
        assert_eq!(idx.raw(), 333_333_333_333_333_333);
        assert!(idx.accrued_on(Decimal::from(3)).unwrap() < Decimal::ONE);
    }

    #[test]
    fn test_yield_index_zero_supply() {
        let r = YieldIndex::per_token(Decimal::ONE, Decimal::ZERO);
        assert_eq!(r, Err(NumericError::DivisionByZero));
    }

    #[test]
    fn test_yield_index_checked_add_overflow() {
        let a = YieldIndex::from_raw(u128::MAX);
        assert_eq!(a.checked_add(YieldIndex::from_raw(1)), Err(NumericError::Overflow));
    }

    #[test]
    fn test_yield_index_serialization() {
        let idx = YieldIndex::from_raw(42);
        let json = serde_json::to_string(&idx).unwrap();
        assert_eq!(json, "42");
    }

    mod fuzz {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fuzz_fraction_never_exceeds_amount(amount in 0u64..1_000_000_000_000u64, bps in 0u32..=10_000u32) {
                let amount = Decimal::from(amount);
                let part = Bps::new(bps).apply(amount);
                prop_assert!(part <= amount);
                prop_assert!(part >= Decimal::ZERO);
            }

            #[test]
            fn fuzz_index_payout_bounded_by_distribution(
                amount in 1u64..1_000_000_000u64,
                supply in 1u64..1_000_000_000u64,
            ) {
                let amount = Decimal::from(amount);
                let supply = Decimal::from(supply);
                let idx = YieldIndex::per_token(amount, supply).unwrap();
                prop_assert!(idx.accrued_on(supply).unwrap() <= amount);
            }
        }
    }
}
