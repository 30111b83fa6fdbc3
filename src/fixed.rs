// 1.6: fixed-point helpers. every multiply-then-divide in the engine goes through mul_div
// with an explicit rounding direction. payouts and shares round down, charges round up.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

// amounts and shares keep 18 decimal places, same resolution as a 1e18-scaled integer
pub const AMOUNT_DP: u32 = 18;
pub const WAD_DP: u32 = 18;

const WAD: u64 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    // toward zero. favors the pool when paying out
    Down,
    // away from zero. favors the pool when charging
    Up,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::Down => RoundingStrategy::ToZero,
            Rounding::Up => RoundingStrategy::AwayFromZero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

pub fn round(value: Decimal, dp: u32, rounding: Rounding) -> Decimal {
    value.round_dp_with_strategy(dp, rounding.strategy())
}

// a * b / c at 18dp
pub fn mul_div(a: Decimal, b: Decimal, c: Decimal, rounding: Rounding) -> Result<Decimal, MathError> {
    if c.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let quotient = product.checked_div(c).ok_or(MathError::Overflow)?;
    Ok(round(quotient, AMOUNT_DP, rounding))
}

// a * b at 18dp
pub fn mul(a: Decimal, b: Decimal, rounding: Rounding) -> Result<Decimal, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(round(product, AMOUNT_DP, rounding))
}

// a / b at 18dp
pub fn div(a: Decimal, b: Decimal, rounding: Rounding) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(MathError::Overflow)?;
    Ok(round(quotient, AMOUNT_DP, rounding))
}

pub fn add(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

pub fn from_wad(wad: u128) -> Option<Decimal> {
    let raw = i128::try_from(wad).ok()?;
    Decimal::try_from_i128_with_scale(raw, WAD_DP).ok()
}

pub fn to_wad(value: Decimal) -> Option<u128> {
    value.checked_mul(Decimal::from(WAD))?.trunc().to_u128()
}
