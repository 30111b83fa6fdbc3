// 2.0: pricer. utilization in, annualized spread out. pure functions, no state.
// spread(u) = base + slope * u^2 / (1 - u). diverges at u = 1 so the pool caps u well below it.
// 2.1 is the curve, 2.2 the premium quote, 2.3 helpers the engine uses to lock a spread in.

use crate::fixed::{self, MathError, Rounding};
use crate::types::{Amount, Rate, SECONDS_PER_YEAR};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// fixed-step trapezoid over [u_before, u_after]
pub const INTEGRATION_STEPS: u32 = 10;

pub const DEFAULT_MAX_UTILIZATION: Decimal = dec!(0.95);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveParams {
    pub base_spread: Rate,
    pub slope: Rate,
    pub max_utilization: Rate,
}

impl CurveParams {
    pub fn new(base_spread: Rate, slope: Rate) -> Self {
        Self {
            base_spread,
            slope,
            max_utilization: Rate::new(DEFAULT_MAX_UTILIZATION),
        }
    }

    pub fn with_max_utilization(mut self, max_utilization: Rate) -> Self {
        self.max_utilization = max_utilization;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("No liquidity to price against")]
    InsufficientLiquidity,

    #[error("Utilization {requested} would exceed cap {max}")]
    UtilizationCapExceeded { requested: Rate, max: Rate },

    #[error("Utilization {0} outside curve domain [0, 1)")]
    OutOfDomain(Rate),

    #[error("Notional must be positive, got {0}")]
    InvalidNotional(Amount),

    #[error("Pricing math: {0}")]
    Math(#[from] MathError),
}

/// Result of pricing a finite-size purchase against the curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumQuote {
    pub notional: Amount,
    pub premium: Amount,
    pub utilization_before: Rate,
    pub utilization_after: Rate,
    pub spread_before: Rate,
    pub spread_after: Rate,
    /// Average annualized spread across the utilization range.
    pub average_spread: Rate,
    pub tenor_secs: i64,
}

// 2.1: the curve itself
pub fn spread(utilization: Rate, curve: &CurveParams) -> Result<Rate, PricingError> {
    let u = utilization.value();
    if u < Decimal::ZERO || u >= Decimal::ONE {
        return Err(PricingError::OutOfDomain(utilization));
    }
    if u.is_zero() {
        return Ok(curve.base_spread);
    }
    let u_squared = fixed::mul(u, u, Rounding::Up)?;
    let premium_term = fixed::mul_div(curve.slope.value(), u_squared, Decimal::ONE - u, Rounding::Up)?;
    Ok(Rate::new(fixed::add(curve.base_spread.value(), premium_term)?))
}

// zero when the pool is empty
pub fn utilization(protection_sold: Amount, total_assets: Amount) -> Rate {
    if !total_assets.is_positive() {
        return Rate::ZERO;
    }
    fixed::div(protection_sold.value(), total_assets.value(), Rounding::Down)
        .map(Rate::new)
        .unwrap_or(Rate::ZERO)
}

// 2.2: premium for moving utilization from existing/liquidity to (existing+notional)/liquidity
pub fn quote_premium(
    notional: Amount,
    total_liquidity: Amount,
    existing_protection: Amount,
    curve: &CurveParams,
    tenor_secs: i64,
) -> Result<PremiumQuote, PricingError> {
    if !total_liquidity.is_positive() {
        return Err(PricingError::InsufficientLiquidity);
    }
    if !notional.is_positive() {
        return Err(PricingError::InvalidNotional(notional));
    }

    let liquidity = total_liquidity.value();
    let protection_after = fixed::add(existing_protection.value(), notional.value())?;

    // exact comparison so rounding can never let a purchase slip past the cap
    let cap = fixed::mul(curve.max_utilization.value(), liquidity, Rounding::Down)?;
    let u_after = Rate::new(fixed::div(protection_after, liquidity, Rounding::Up)?);
    if protection_after > cap {
        return Err(PricingError::UtilizationCapExceeded {
            requested: u_after,
            max: curve.max_utilization,
        });
    }
    let u_before = Rate::new(fixed::div(existing_protection.value(), liquidity, Rounding::Up)?);

    let average = average_spread(u_before, u_after, curve)?;
    let tenor = Decimal::from(tenor_secs.max(0));
    let annual_cost = fixed::mul(notional.value(), average.value(), Rounding::Up)?;
    let premium = fixed::mul_div(annual_cost, tenor, Decimal::from(SECONDS_PER_YEAR), Rounding::Up)?;

    Ok(PremiumQuote {
        notional,
        premium: Amount::new(premium),
        utilization_before: u_before,
        utilization_after: u_after,
        spread_before: spread(u_before, curve)?,
        spread_after: spread(u_after, curve)?,
        average_spread: average,
        tenor_secs: tenor_secs.max(0),
    })
}

// trapezoid rule divided by the interval width: mean spread over [from, to]
fn average_spread(from: Rate, to: Rate, curve: &CurveParams) -> Result<Rate, PricingError> {
    let lo = from.value();
    let hi = to.value();
    if hi <= lo {
        return spread(from, curve);
    }

    let steps = Decimal::from(INTEGRATION_STEPS);
    let step = fixed::div(fixed::sub(hi, lo)?, steps, Rounding::Down)?;

    let endpoints = fixed::add(spread(from, curve)?.value(), spread(to, curve)?.value())?;
    let mut weighted = fixed::div(endpoints, dec!(2), Rounding::Up)?;
    for i in 1..INTEGRATION_STEPS {
        let u = fixed::add(lo, fixed::mul(step, Decimal::from(i), Rounding::Down)?)?;
        weighted = fixed::add(weighted, spread(Rate::new(u), curve)?.value())?;
    }

    Ok(Rate::new(fixed::div(weighted, steps, Rounding::Up)?))
}

// 2.3: floor any quote must clear, the base spread applied flat over the tenor
pub fn base_rate_premium(notional: Amount, base_spread: Rate, tenor_secs: i64) -> Result<Amount, MathError> {
    let annual = fixed::mul(notional.value(), base_spread.value(), Rounding::Down)?;
    fixed::mul_div(
        annual,
        Decimal::from(tenor_secs.max(0)),
        Decimal::from(SECONDS_PER_YEAR),
        Rounding::Down,
    )
    .map(Amount::new)
}

// spread locked into a position: premium * year / (notional * tenor)
pub fn implied_annual_spread(premium: Amount, notional: Amount, tenor_secs: i64) -> Result<Rate, MathError> {
    let exposure = fixed::mul(notional.value(), Decimal::from(tenor_secs), Rounding::Up)?;
    fixed::mul_div(premium.value(), Decimal::from(SECONDS_PER_YEAR), exposure, Rounding::Down).map(Rate::new)
}
