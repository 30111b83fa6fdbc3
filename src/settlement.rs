// 5.0 settlement.rs: pool lifecycle and credit-event payouts.
// Active -> Triggered -> Settled, or Active -> Expired. Settled and Expired are terminal.
// payouts are never pushed. they are recorded per buyer and pulled with a claim.

use crate::fixed::{self, MathError, Rounding};
use crate::types::{AccountId, Amount, PositionId, Rate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    #[default]
    Active,
    Triggered,
    Settled,
    Expired,
}

impl PoolStatus {
    pub fn can_transition_to(&self, next: PoolStatus) -> bool {
        matches!(
            (self, next),
            (PoolStatus::Active, PoolStatus::Triggered)
                | (PoolStatus::Triggered, PoolStatus::Settled)
                | (PoolStatus::Active, PoolStatus::Expired)
        )
    }

    // frozen while a credit event awaits its recovery rate
    pub fn allows_withdrawal(&self) -> bool {
        !matches!(self, PoolStatus::Triggered)
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolStatus::Active => "active",
            PoolStatus::Triggered => "triggered",
            PoolStatus::Settled => "settled",
            PoolStatus::Expired => "expired",
        };
        f.write_str(name)
    }
}

// 5.1: pull-claim balances. credited at settlement, zeroed on claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimBook {
    claims: BTreeMap<AccountId, Amount>,
}

impl ClaimBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claimable(&self, holder: AccountId) -> Amount {
        self.claims.get(&holder).copied().unwrap_or(Amount::ZERO)
    }

    pub fn outstanding(&self) -> Amount {
        self.claims.values().copied().sum()
    }

    pub fn credit(&mut self, holder: AccountId, amount: Amount) -> Result<(), MathError> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self.claimable(holder).checked_add(amount).ok_or(MathError::Overflow)?;
        self.claims.insert(holder, balance);
        Ok(())
    }

    // removes and returns the balance. zero if nothing was recorded
    pub fn take(&mut self, holder: AccountId) -> Amount {
        self.claims.remove(&holder).unwrap_or(Amount::ZERO)
    }
}

/// Liability of one position at a given loss rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exposure {
    pub position_id: PositionId,
    pub buyer: AccountId,
    pub notional: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub position_id: PositionId,
    pub buyer: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutAllocation {
    pub loss_rate: Rate,
    pub payouts: Vec<Payout>,
    pub total_liability: Amount,
    pub total_payout: Amount,
    // true when deposits could not cover notional * loss_rate for everyone
    pub pro_rata: bool,
}

// 5.2: each position is owed notional * loss_rate. when the sum exceeds the deposits
// available, every payout is scaled by available / liability so processing order never
// matters. all rounding is down so total payout never exceeds available.
pub fn allocate_payouts(
    exposures: &[Exposure],
    recovery_rate: Rate,
    available: Amount,
) -> Result<PayoutAllocation, MathError> {
    let loss_rate = recovery_rate.complement();

    let mut liabilities = Vec::with_capacity(exposures.len());
    let mut total_liability = Amount::ZERO;
    for exposure in exposures {
        let owed = Amount::new(fixed::mul(exposure.notional.value(), loss_rate.value(), Rounding::Down)?);
        total_liability = total_liability.checked_add(owed).ok_or(MathError::Overflow)?;
        liabilities.push(owed);
    }

    let pro_rata = total_liability > available;
    let mut payouts = Vec::with_capacity(exposures.len());
    let mut total_payout = Amount::ZERO;
    for (exposure, owed) in exposures.iter().zip(liabilities) {
        let amount = if pro_rata {
            Amount::new(fixed::mul_div(
                owed.value(),
                available.value(),
                total_liability.value(),
                Rounding::Down,
            )?)
        } else {
            owed
        };
        total_payout = total_payout.checked_add(amount).ok_or(MathError::Overflow)?;
        payouts.push(Payout {
            position_id: exposure.position_id,
            buyer: exposure.buyer,
            amount,
        });
    }

    Ok(PayoutAllocation {
        loss_rate,
        payouts,
        total_liability,
        total_payout,
        pro_rata,
    })
}
