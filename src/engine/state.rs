// 8.0.1 engine/state.rs: every pool aggregate. operations mutate a clone of this and the
// clone replaces the live state only after check_invariants passes.

use crate::config::{PoolConfig, PoolTerms};
use crate::fixed::{self, MathError, Rounding};
use crate::ledger::ShareLedger;
use crate::position::{AccrualPlan, PositionBook};
use crate::pricing;
use crate::settlement::{ClaimBook, PoolStatus};
use crate::types::{Amount, Bps, Rate, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub(crate) ledger: ShareLedger,
    pub(crate) book: PositionBook,
    pub(crate) claims: ClaimBook,
    // raw collateral contributed by LPs, less withdrawals and settlement losses
    pub(crate) total_deposits: Amount,
    // accrued premium net of the protocol fee
    pub(crate) total_premiums_earned: Amount,
    // protocol fee cut not yet forwarded to the fee sink
    pub(crate) fees_owed: Amount,
    pub(crate) last_accrual: Timestamp,
    pub(crate) status: PoolStatus,
}

/// Accrual a pass would perform right now, without applying it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccrualPreview {
    pub plan: AccrualPlan,
    pub until: Timestamp,
    pub protocol_fee: Amount,
    pub net: Amount,
}

impl PoolState {
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            ledger: ShareLedger::new(),
            book: PositionBook::new(),
            claims: ClaimBook::new(),
            total_deposits: Amount::ZERO,
            total_premiums_earned: Amount::ZERO,
            fees_owed: Amount::ZERO,
            last_accrual: created_at,
            status: PoolStatus::Active,
        }
    }

    pub fn status(&self) -> PoolStatus {
        self.status
    }

    pub fn total_assets(&self) -> Result<Amount, MathError> {
        self.total_deposits
            .checked_add(self.total_premiums_earned)
            .ok_or(MathError::Overflow)
    }

    // everything the vault should hold: LP assets, unearned premium, fees, unpaid claims
    pub fn custody_owed(&self) -> Result<Amount, MathError> {
        self.total_assets()?
            .checked_add(self.book.unearned_premiums())
            .and_then(|owed| owed.checked_add(self.fees_owed))
            .and_then(|owed| owed.checked_add(self.claims.outstanding()))
            .ok_or(MathError::Overflow)
    }

    pub fn utilization(&self) -> Result<Rate, MathError> {
        Ok(pricing::utilization(self.book.total_protection_sold(), self.total_assets()?))
    }

    // accrual only runs while Active, and never past maturity
    pub fn preview_accrual(&self, now: Timestamp, terms: &PoolTerms, config: &PoolConfig) -> Result<AccrualPreview, MathError> {
        let until = now.min(terms.maturity).max(self.last_accrual);
        if self.status != PoolStatus::Active {
            return Ok(AccrualPreview {
                until: self.last_accrual,
                ..AccrualPreview::default()
            });
        }
        let elapsed = self.last_accrual.secs_until(until);
        let plan = self.book.plan_accrual(elapsed)?;
        let (protocol_fee, net) = fee_split(plan.gross, config.protocol_fee_bps)?;
        Ok(AccrualPreview {
            plan,
            until,
            protocol_fee,
            net,
        })
    }

    // splits recognized premium between LPs and the fee sink
    pub(crate) fn credit_premium(&mut self, gross: Amount, fee_bps: Bps) -> Result<(Amount, Amount), MathError> {
        let (fee, net) = fee_split(gross, fee_bps)?;
        self.total_premiums_earned = self.total_premiums_earned.checked_add(net).ok_or(MathError::Overflow)?;
        self.fees_owed = self.fees_owed.checked_add(fee).ok_or(MathError::Overflow)?;
        Ok((fee, net))
    }

    pub(crate) fn take_fees(&mut self) -> Amount {
        std::mem::replace(&mut self.fees_owed, Amount::ZERO)
    }

    /// Checked after every operation, before commit.
    pub fn check_invariants(&self, config: &PoolConfig) -> Result<(), String> {
        let assets = self.total_assets().map_err(|e| e.to_string())?;
        let sold = self.book.total_protection_sold();

        if self.total_deposits.value().is_sign_negative() && !self.total_deposits.is_zero() {
            return Err(format!("negative deposits {}", self.total_deposits));
        }
        if self.total_premiums_earned.value().is_sign_negative() && !self.total_premiums_earned.is_zero() {
            return Err(format!("negative premiums {}", self.total_premiums_earned));
        }

        if self.status == PoolStatus::Active && assets < sold {
            return Err(format!("insolvent: assets {} below protection sold {}", assets, sold));
        }

        if self.ledger.total_shares().is_zero() != assets.is_zero() {
            return Err(format!(
                "share/asset mismatch: {} shares against {} assets",
                self.ledger.total_shares(),
                assets
            ));
        }

        let cap = fixed::mul(config.max_utilization.value(), assets.value(), Rounding::Down).map_err(|e| e.to_string())?;
        if sold.value() > cap {
            return Err(format!("utilization cap breached: {} sold against cap {}", sold, cap));
        }

        let mut active_notional = Amount::ZERO;
        for position in self.book.active_positions() {
            active_notional = Amount::new(active_notional.value() + position.notional.value());
        }
        if active_notional != sold {
            return Err(format!("protection sold {} != active notional {}", sold, active_notional));
        }

        if let Some(position) = self.book.all().iter().find(|p| p.accrued_premium > p.premium_paid) {
            return Err(format!("position {} accrued past premium paid", position.id));
        }

        Ok(())
    }
}

fn fee_split(gross: Amount, fee_bps: Bps) -> Result<(Amount, Amount), MathError> {
    if gross.is_zero() {
        return Ok((Amount::ZERO, Amount::ZERO));
    }
    let fee = Amount::new(fixed::mul(gross.value(), fee_bps.as_fraction(), Rounding::Down)?);
    let net = gross.checked_sub(fee).ok_or(MathError::Overflow)?;
    Ok((fee, net))
}
