//! Premium accrual and protocol fee collection.

use super::core::{Draft, Pool};
use super::results::{AccrualResult, PoolError};
use crate::credit_feed::CreditEventSource;
use crate::custody::SettlementAsset;
use crate::events::{EventPayload, FeesCollectedEvent, PremiumsAccruedEvent};
use crate::types::{Amount, PositionId};

impl Draft<'_> {
    /// Recognize premium for every active position since the last pass. No-op unless Active.
    pub(super) fn accrue(&mut self) -> Result<AccrualResult, PoolError> {
        let preview = self.state.preview_accrual(self.now, self.terms, self.config)?;
        if preview.plan.elapsed_secs > 0 {
            self.state.last_accrual = preview.until;
        }
        if preview.plan.is_empty() {
            return Ok(AccrualResult {
                elapsed_secs: preview.plan.elapsed_secs,
                ..AccrualResult::default()
            });
        }

        self.state.book.apply_accrual(&preview.plan)?;
        let (protocol_fee, net) = self.state.credit_premium(preview.plan.gross, self.config.protocol_fee_bps)?;

        let result = AccrualResult {
            elapsed_secs: preview.plan.elapsed_secs,
            positions: preview.plan.deltas.len(),
            gross: preview.plan.gross,
            protocol_fee,
            net,
        };
        self.emit(EventPayload::PremiumsAccrued(PremiumsAccruedEvent {
            elapsed_secs: result.elapsed_secs,
            positions: result.positions,
            gross: result.gross,
            protocol_fee: result.protocol_fee,
            net: result.net,
        }));
        Ok(result)
    }

    // whatever premium the position has not yet recognized becomes earned now
    pub(super) fn recognize_remaining(&mut self, id: PositionId) -> Result<Amount, PoolError> {
        let unearned = self
            .state
            .book
            .get(id)
            .ok_or(PoolError::PositionNotFound(id))?
            .unearned_premium();
        self.recognize(id, unearned)
    }

    pub(super) fn recognize(&mut self, id: PositionId, amount: Amount) -> Result<Amount, PoolError> {
        let recognized = self.state.book.recognize(id, amount)?;
        self.state.credit_premium(recognized, self.config.protocol_fee_bps)?;
        Ok(recognized)
    }
}

impl<A: SettlementAsset, E: CreditEventSource> Pool<A, E> {
    pub fn accrue_all_premiums(&mut self) -> Result<AccrualResult, PoolError> {
        self.transact("accrue_all_premiums", |draft| draft.accrue())
    }

    /// Forward the booked protocol fee to the fee sink.
    pub fn collect_fees(&mut self) -> Result<Amount, PoolError> {
        self.transact("collect_fees", |draft| {
            draft.accrue()?;
            let fee_sink = draft.config.fee_sink;
            let amount = draft.state.take_fees();
            if amount.is_zero() {
                return Err(PoolError::NothingToClaim(fee_sink));
            }
            draft.push(fee_sink, amount)?;
            draft.emit(EventPayload::FeesCollected(FeesCollectedEvent { fee_sink, amount }));
            Ok(amount)
        })
    }
}
