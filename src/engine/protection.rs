//! Protection purchase and early close-out.

use super::core::Pool;
use super::results::{BuyResult, CloseResult, PoolError};
use crate::credit_feed::CreditEventSource;
use crate::custody::SettlementAsset;
use crate::events::{EventPayload, ProtectionBoughtEvent, ProtectionClosedEvent};
use crate::position::{CloseReason, NewPosition};
use crate::pricing;
use crate::settlement::PoolStatus;
use crate::types::{AccountId, Amount, PositionId};

impl<A: SettlementAsset, E: CreditEventSource> Pool<A, E> {
    /// Buy `notional` of protection to maturity, paying the quoted premium up front.
    /// Fails with SlippageExceeded when the quote is above `max_premium`.
    pub fn buy_protection(
        &mut self,
        buyer: AccountId,
        notional: Amount,
        max_premium: Amount,
    ) -> Result<BuyResult, PoolError> {
        self.transact("buy_protection", |draft| {
            if !notional.is_positive() {
                return Err(PoolError::invalid(format!("notional must be positive, got {}", notional)));
            }
            draft.require_status(PoolStatus::Active, "buy_protection")?;
            draft.require_before_maturity()?;
            let max_active = draft.config.max_active_positions;
            if draft.state.book.active_count() >= max_active {
                return Err(PoolError::CapacityExceeded { max: max_active });
            }
            draft.accrue()?;

            let tenor = draft.now.secs_until(draft.terms.maturity);
            let quote = pricing::quote_premium(
                notional,
                draft.state.total_assets()?,
                draft.state.book.total_protection_sold(),
                &draft.terms.curve(draft.config),
                tenor,
            )?;
            if !quote.premium.is_positive() {
                return Err(PoolError::invalid(format!("notional {} prices to zero premium", notional)));
            }
            if quote.premium > max_premium {
                return Err(PoolError::SlippageExceeded {
                    quoted: quote.premium,
                    max: max_premium,
                });
            }

            draft.require_within_ceiling(quote.premium)?;

            let locked_spread = pricing::implied_annual_spread(quote.premium, notional, tenor)?;
            let position_id = draft.state.book.open(
                NewPosition {
                    buyer,
                    notional,
                    premium_paid: quote.premium,
                    locked_spread,
                    start: draft.now,
                    maturity: draft.terms.maturity,
                },
                max_active,
            )?;
            draft.pull(buyer, quote.premium)?;

            draft.emit(EventPayload::ProtectionBought(ProtectionBoughtEvent {
                position_id,
                buyer,
                notional,
                premium: quote.premium,
                locked_spread,
                utilization_after: quote.utilization_after,
            }));
            Ok(BuyResult {
                position_id,
                premium: quote.premium,
                locked_spread,
                utilization_after: quote.utilization_after,
            })
        })
    }

    /// Close a position before maturity. The straight-line earned share of the premium
    /// stays with the pool; the rest goes back to the buyer.
    pub fn close_protection(&mut self, caller: AccountId, position_id: PositionId) -> Result<CloseResult, PoolError> {
        self.transact("close_protection", |draft| {
            let position = draft
                .state
                .book
                .get(position_id)
                .ok_or(PoolError::PositionNotFound(position_id))?;
            if position.buyer != caller {
                return Err(PoolError::Unauthorized { caller });
            }
            if !position.active {
                return Err(PoolError::PositionInactive(position_id));
            }
            draft.require_status(PoolStatus::Active, "close_protection")?;
            draft.accrue()?;

            let position = draft
                .state
                .book
                .get(position_id)
                .ok_or(PoolError::PositionNotFound(position_id))?;
            let earned = position.earned_premium_at(draft.now)?.max(position.accrued_premium);
            let top_up = earned.saturating_sub(position.accrued_premium);
            let refund = position.premium_paid.saturating_sub(earned);

            draft.recognize(position_id, top_up)?;
            draft.state.book.deactivate(position_id, CloseReason::BuyerClosed, draft.now)?;
            draft.push(caller, refund)?;

            draft.emit(EventPayload::ProtectionClosed(ProtectionClosedEvent {
                position_id,
                buyer: caller,
                reason: CloseReason::BuyerClosed,
                earned_premium: earned,
                refund,
            }));
            Ok(CloseResult {
                position_id,
                earned_premium: earned,
                refund,
            })
        })
    }
}
