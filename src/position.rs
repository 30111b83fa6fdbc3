// 4.0: protection positions. 4.0 is the struct, 4.1 the book that owns them, 4.2 premium accrual.
// positions live in an id-indexed arena. the active set is a dense id list plus an id -> slot
// index so closing any position is O(1) swap-remove.

use crate::fixed::{self, MathError, Rounding};
use crate::types::{AccountId, Amount, PositionId, Rate, Timestamp, SECONDS_PER_YEAR};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    BuyerClosed,
    Settled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub buyer: AccountId,
    pub notional: Amount,
    pub premium_paid: Amount,
    // average spread of the purchase, premium * year / (notional * tenor)
    pub locked_spread: Rate,
    pub start: Timestamp,
    pub maturity: Timestamp,
    // premium already recognized for the pool. never exceeds premium_paid
    pub accrued_premium: Amount,
    pub active: bool,
    pub closed_at: Option<Timestamp>,
    pub close_reason: Option<CloseReason>,
}

impl Position {
    pub fn tenor_secs(&self) -> i64 {
        self.start.secs_until(self.maturity)
    }

    pub fn unearned_premium(&self) -> Amount {
        self.premium_paid.saturating_sub(self.accrued_premium)
    }

    // straight-line share of the premium earned by `now`, capped at maturity
    pub fn earned_premium_at(&self, now: Timestamp) -> Result<Amount, MathError> {
        let tenor = self.tenor_secs();
        if tenor == 0 {
            return Ok(self.premium_paid);
        }
        let elapsed = self.start.secs_until(now).min(tenor);
        fixed::mul_div(
            self.premium_paid.value(),
            Decimal::from(elapsed),
            Decimal::from(tenor),
            Rounding::Down,
        )
        .map(Amount::new)
    }

    // notional * locked_spread * elapsed / year, capped at what's left unrecognized
    pub fn accrual_delta(&self, elapsed_secs: i64) -> Result<Amount, MathError> {
        if elapsed_secs <= 0 {
            return Ok(Amount::ZERO);
        }
        let annual = fixed::mul(self.notional.value(), self.locked_spread.value(), Rounding::Down)?;
        let delta = fixed::mul_div(
            annual,
            Decimal::from(elapsed_secs),
            Decimal::from(SECONDS_PER_YEAR),
            Rounding::Down,
        )?;
        Ok(Amount::new(delta).min(self.unearned_premium()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("Position {0} not found")]
    NotFound(PositionId),

    #[error("Position {0} is not active")]
    NotActive(PositionId),

    #[error("Active position limit {max} reached")]
    CapacityExceeded { max: usize },

    #[error("Position math: {0}")]
    Math(#[from] MathError),
}

/// New position terms, validated by the caller.
#[derive(Debug, Clone, Copy)]
pub struct NewPosition {
    pub buyer: AccountId,
    pub notional: Amount,
    pub premium_paid: Amount,
    pub locked_spread: Rate,
    pub start: Timestamp,
    pub maturity: Timestamp,
}

// 4.2: what an accrual pass would recognize, computed without touching the book
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccrualPlan {
    pub elapsed_secs: i64,
    pub deltas: Vec<(PositionId, Amount)>,
    pub gross: Amount,
}

impl AccrualPlan {
    pub fn is_empty(&self) -> bool {
        self.gross.is_zero()
    }
}

// 4.1
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBook {
    positions: Vec<Position>,
    active: Vec<PositionId>,
    slots: BTreeMap<PositionId, usize>,
    total_notional: Amount,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn all(&self) -> &[Position] {
        &self.positions
    }

    pub fn active_ids(&self) -> &[PositionId] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_positions(&self) -> impl Iterator<Item = &Position> {
        self.active.iter().filter_map(|id| self.positions.get(id.index()))
    }

    /// Sum of notional over active positions.
    pub fn total_protection_sold(&self) -> Amount {
        self.total_notional
    }

    pub fn unearned_premiums(&self) -> Amount {
        self.active_positions().map(Position::unearned_premium).sum()
    }

    pub fn open(&mut self, terms: NewPosition, max_active: usize) -> Result<PositionId, BookError> {
        if self.active.len() >= max_active {
            return Err(BookError::CapacityExceeded { max: max_active });
        }
        let total = self.total_notional.checked_add(terms.notional).ok_or(MathError::Overflow)?;

        let id = PositionId(self.positions.len() as u64);
        self.positions.push(Position {
            id,
            buyer: terms.buyer,
            notional: terms.notional,
            premium_paid: terms.premium_paid,
            locked_spread: terms.locked_spread,
            start: terms.start,
            maturity: terms.maturity,
            accrued_premium: Amount::ZERO,
            active: true,
            closed_at: None,
            close_reason: None,
        });
        self.slots.insert(id, self.active.len());
        self.active.push(id);
        self.total_notional = total;
        Ok(id)
    }

    pub fn plan_accrual(&self, elapsed_secs: i64) -> Result<AccrualPlan, MathError> {
        let mut plan = AccrualPlan {
            elapsed_secs,
            ..AccrualPlan::default()
        };
        if elapsed_secs <= 0 {
            return Ok(plan);
        }
        for position in self.active_positions() {
            let delta = position.accrual_delta(elapsed_secs)?;
            if delta.is_positive() {
                plan.gross = plan.gross.checked_add(delta).ok_or(MathError::Overflow)?;
                plan.deltas.push((position.id, delta));
            }
        }
        Ok(plan)
    }

    pub fn apply_accrual(&mut self, plan: &AccrualPlan) -> Result<(), BookError> {
        for &(id, delta) in &plan.deltas {
            self.recognize(id, delta)?;
        }
        Ok(())
    }

    // bumps the accrued tracker, clipped at premium paid. returns what was actually recognized
    pub fn recognize(&mut self, id: PositionId, amount: Amount) -> Result<Amount, BookError> {
        let position = self.positions.get_mut(id.index()).ok_or(BookError::NotFound(id))?;
        let recognized = amount.min(position.unearned_premium());
        position.accrued_premium = position.accrued_premium.checked_add(recognized).ok_or(MathError::Overflow)?;
        Ok(recognized)
    }

    pub fn deactivate(&mut self, id: PositionId, reason: CloseReason, now: Timestamp) -> Result<Position, BookError> {
        let slot = *self.slots.get(&id).ok_or_else(|| match self.get(id) {
            Some(_) => BookError::NotActive(id),
            None => BookError::NotFound(id),
        })?;

        let position = self.positions.get_mut(id.index()).ok_or(BookError::NotFound(id))?;
        position.active = false;
        position.closed_at = Some(now);
        position.close_reason = Some(reason);
        let closed = position.clone();

        self.active.swap_remove(slot);
        self.slots.remove(&id);
        if let Some(&moved) = self.active.get(slot) {
            self.slots.insert(moved, slot);
        }
        self.total_notional = self.total_notional.saturating_sub(closed.notional);
        Ok(closed)
    }
}
