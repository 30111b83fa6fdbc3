// 8.6 engine/lifecycle.rs: credit event trigger, settlement, expiry and payout claims.

use super::core::Pool;
use super::results::{ExpiryResult, PoolError, SettlementResult};
use crate::credit_feed::CreditEventSource;
use crate::custody::SettlementAsset;
use crate::events::{
    CreditEventTriggeredEvent, EventPayload, PoolExpiredEvent, PoolSettledEvent, ProtectionClosedEvent,
    SettlementClaimedEvent,
};
use crate::fixed::MathError;
use crate::position::CloseReason;
use crate::settlement::{self, Exposure, PoolStatus};
use crate::types::{AccountId, Amount, Rate};

impl<A: SettlementAsset, E: CreditEventSource> Pool<A, E> {
    /// Freeze the pool once the reporter confirms a credit event. Anyone may call this.
    pub fn trigger_credit_event(&mut self) -> Result<(), PoolError> {
        let reference = self.terms.reference_asset.clone();
        let reported = self.event_source.has_active_event(&reference);

        self.transact("trigger_credit_event", |draft| {
            draft.require_status(PoolStatus::Active, "trigger_credit_event")?;
            draft.require_before_maturity()?;
            if !reported {
                return Err(PoolError::CreditEventNotReported(reference.clone()));
            }
            draft.accrue()?;
            draft.transition(PoolStatus::Triggered, "trigger_credit_event")?;

            draft.emit(EventPayload::CreditEventTriggered(CreditEventTriggeredEvent {
                reference_asset: reference.clone(),
                protection_outstanding: draft.state.book.total_protection_sold(),
            }));
            Ok(())
        })?;

        tracing::info!(reference = %self.terms.reference_asset, "credit event triggered, withdrawals frozen");
        Ok(())
    }

    /// Book payouts of notional * (1 - recovery_rate) for every active position. When
    /// deposits fall short every payout is scaled by the same factor.
    pub fn settle(&mut self, caller: AccountId, recovery_rate: Rate) -> Result<SettlementResult, PoolError> {
        let result = self.transact("settle", |draft| {
            draft.require_status(PoolStatus::Triggered, "settle")?;
            if caller != draft.config.settlement_authority {
                return Err(PoolError::Unauthorized { caller });
            }
            if !recovery_rate.is_fraction() {
                return Err(PoolError::invalid(format!("recovery rate {} outside [0, 1]", recovery_rate)));
            }

            let exposures: Vec<Exposure> = draft
                .state
                .book
                .active_positions()
                .map(|p| Exposure {
                    position_id: p.id,
                    buyer: p.buyer,
                    notional: p.notional,
                })
                .collect();
            let allocation = settlement::allocate_payouts(&exposures, recovery_rate, draft.state.total_deposits)?;

            for payout in &allocation.payouts {
                draft.state.claims.credit(payout.buyer, payout.amount)?;
                let residual = draft.recognize_remaining(payout.position_id)?;
                let closed = draft.state.book.deactivate(payout.position_id, CloseReason::Settled, draft.now)?;
                draft.emit(EventPayload::ProtectionClosed(ProtectionClosedEvent {
                    position_id: closed.id,
                    buyer: closed.buyer,
                    reason: CloseReason::Settled,
                    earned_premium: residual,
                    refund: Amount::ZERO,
                }));
            }
            draft.state.total_deposits = draft
                .state
                .total_deposits
                .checked_sub(allocation.total_payout)
                .ok_or(MathError::Overflow)?;
            draft.transition(PoolStatus::Settled, "settle")?;

            let result = SettlementResult {
                loss_rate: allocation.loss_rate,
                positions_settled: allocation.payouts.len(),
                total_liability: allocation.total_liability,
                total_payout: allocation.total_payout,
                pro_rata: allocation.pro_rata,
            };
            draft.emit(EventPayload::PoolSettled(PoolSettledEvent {
                recovery_rate,
                positions_settled: result.positions_settled,
                total_liability: result.total_liability,
                total_payout: result.total_payout,
                pro_rata: result.pro_rata,
            }));
            Ok(result)
        })?;

        tracing::info!(
            %recovery_rate,
            payout = %result.total_payout,
            pro_rata = result.pro_rata,
            "pool settled"
        );
        Ok(result)
    }

    /// Close the pool at maturity with no credit event. Remaining premium is earned in full.
    pub fn expire(&mut self) -> Result<ExpiryResult, PoolError> {
        let result = self.transact("expire", |draft| {
            draft.require_status(PoolStatus::Active, "expire")?;
            if draft.now < draft.terms.maturity {
                return Err(PoolError::NotYetMatured {
                    maturity: draft.terms.maturity,
                });
            }
            draft.accrue()?;

            let active = draft.state.book.active_ids().to_vec();
            let mut residual_premium = Amount::ZERO;
            for id in &active {
                let residual = draft.recognize_remaining(*id)?;
                residual_premium = residual_premium.checked_add(residual).ok_or(MathError::Overflow)?;
                let closed = draft.state.book.deactivate(*id, CloseReason::Expired, draft.now)?;
                draft.emit(EventPayload::ProtectionClosed(ProtectionClosedEvent {
                    position_id: closed.id,
                    buyer: closed.buyer,
                    reason: CloseReason::Expired,
                    earned_premium: residual,
                    refund: Amount::ZERO,
                }));
            }
            draft.transition(PoolStatus::Expired, "expire")?;

            draft.emit(EventPayload::PoolExpired(PoolExpiredEvent {
                positions_lapsed: active.len(),
                residual_premium,
            }));
            Ok(ExpiryResult {
                positions_lapsed: active.len(),
                residual_premium,
            })
        })?;

        tracing::info!(lapsed = result.positions_lapsed, "pool expired");
        Ok(result)
    }

    /// Pull a settlement payout. The claim is zeroed before the transfer runs.
    pub fn claim_settlement(&mut self, caller: AccountId) -> Result<Amount, PoolError> {
        self.transact("claim_settlement", |draft| {
            let amount = draft.state.claims.take(caller);
            if amount.is_zero() {
                return Err(PoolError::NothingToClaim(caller));
            }
            draft.push(caller, amount)?;
            draft.emit(EventPayload::SettlementClaimed(SettlementClaimedEvent { holder: caller, amount }));
            Ok(amount)
        })
    }
}
