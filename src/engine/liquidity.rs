//! LP deposits and withdrawals.

use super::core::Pool;
use super::results::{DepositResult, PoolError, WithdrawResult};
use crate::credit_feed::CreditEventSource;
use crate::custody::SettlementAsset;
use crate::events::{DepositEvent, EventPayload, WithdrawalEvent};
use crate::fixed::{self, MathError, Rounding};
use crate::settlement::PoolStatus;
use crate::types::{AccountId, Amount, Shares};

impl<A: SettlementAsset, E: CreditEventSource> Pool<A, E> {
    /// Deposit settlement asset and mint shares at the post-accrual share price.
    pub fn deposit(&mut self, holder: AccountId, amount: Amount) -> Result<DepositResult, PoolError> {
        self.transact("deposit", |draft| {
            if !amount.is_positive() {
                return Err(PoolError::invalid(format!("deposit must be positive, got {}", amount)));
            }
            draft.require_status(PoolStatus::Active, "deposit")?;
            draft.accrue()?;
            draft.require_within_ceiling(amount)?;

            let total_assets = draft.state.total_assets()?;
            let shares = draft
                .state
                .ledger
                .preview_mint(amount, total_assets, draft.config.min_initial_deposit)?;

            draft.state.ledger.mint(holder, shares, draft.now)?;
            draft.state.total_deposits = draft.state.total_deposits.checked_add(amount).ok_or(MathError::Overflow)?;
            draft.pull(holder, amount)?;

            let result = DepositResult {
                shares_minted: shares,
                total_assets: draft.state.total_assets()?,
                total_shares: draft.state.ledger.total_shares(),
            };
            draft.emit(EventPayload::Deposit(DepositEvent {
                holder,
                amount,
                shares_minted: shares,
                total_assets: result.total_assets,
            }));
            Ok(result)
        })
    }

    /// Burn shares for their pro-rata value. Frozen while Triggered; while Active the
    /// remaining assets must still back every open position under the utilization cap.
    /// That is stricter than `assets - amount_out >= protection sold`: the post-withdrawal
    /// assets must cover `protection_sold / max_utilization`.
    pub fn withdraw(&mut self, holder: AccountId, shares: Shares) -> Result<WithdrawResult, PoolError> {
        self.transact("withdraw", |draft| {
            if !shares.is_positive() {
                return Err(PoolError::invalid(format!("withdrawal must be positive, got {}", shares)));
            }
            let available = draft.state.ledger.shares_of(holder);
            if shares > available {
                return Err(PoolError::InsufficientShares {
                    requested: shares,
                    available,
                });
            }
            if !draft.state.status.allows_withdrawal() {
                return Err(PoolError::WrongState {
                    operation: "withdraw",
                    status: draft.state.status,
                });
            }
            draft
                .state
                .ledger
                .check_cooldown(holder, draft.now, draft.config.withdrawal_cooldown_secs)?;
            draft.accrue()?;

            let split = draft.state.ledger.preview_withdraw(
                holder,
                shares,
                draft.state.total_deposits,
                draft.state.total_premiums_earned,
            )?;

            if draft.state.status == PoolStatus::Active {
                let total_assets = draft.state.total_assets()?;
                let sold = draft.state.book.total_protection_sold();
                // assets needed to keep sold / assets at or under the cap
                let required =
                    Amount::new(fixed::div(sold.value(), draft.config.max_utilization.value(), Rounding::Up)?);
                let max_withdrawable = total_assets.saturating_sub(required);
                if split.amount_out > max_withdrawable {
                    return Err(PoolError::Undercollateralized {
                        requested: split.amount_out,
                        max_withdrawable,
                    });
                }
            }

            draft.state.total_deposits = draft
                .state
                .total_deposits
                .checked_sub(split.from_deposits)
                .ok_or(MathError::Overflow)?;
            draft.state.total_premiums_earned = draft
                .state
                .total_premiums_earned
                .checked_sub(split.from_premiums)
                .ok_or(MathError::Overflow)?;
            draft.state.ledger.burn(holder, shares)?;
            draft.push(holder, split.amount_out)?;

            draft.emit(EventPayload::Withdrawal(WithdrawalEvent {
                holder,
                shares_burned: shares,
                amount_out: split.amount_out,
                from_deposits: split.from_deposits,
                from_premiums: split.from_premiums,
            }));
            Ok(WithdrawResult {
                amount_out: split.amount_out,
                from_deposits: split.from_deposits,
                from_premiums: split.from_premiums,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::custody::SettlementAsset;
    use crate::engine::testing::{funded_pool, ALICE, BOB, BUYER};
    use crate::engine::{ErrorKind, PoolError};
    use crate::types::{Amount, Shares};
    use rust_decimal_macros::dec;

    const DAY: i64 = 86_400;

    #[test]
    fn first_deposit_mints_one_to_one() {
        let mut pool = funded_pool();
        let result = pool.deposit(ALICE, Amount::new(dec!(750000))).unwrap();

        assert_eq!(result.shares_minted, Shares::new(dec!(750000)));
        assert_eq!(pool.total_assets().unwrap(), Amount::new(dec!(750000)));
        assert_eq!(pool.asset().vault_balance(), Amount::new(dec!(750000)));
    }

    #[test]
    fn first_deposit_below_floor_rejected() {
        let mut pool = funded_pool();
        let err = pool.deposit(ALICE, Amount::new(dec!(999))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(pool.total_shares().is_zero());
        assert!(pool.events().is_empty());
    }

    #[test]
    fn zero_deposit_rejected() {
        let mut pool = funded_pool();
        assert!(matches!(pool.deposit(ALICE, Amount::ZERO), Err(PoolError::InvalidInput { .. })));
    }

    #[test]
    fn cooldown_blocks_early_withdrawal() {
        let mut pool = funded_pool();
        pool.deposit(ALICE, Amount::new(dec!(10000))).unwrap();

        pool.advance_time(DAY - 1);
        let err = pool.withdraw(ALICE, Shares::new(dec!(1))).unwrap_err();
        assert_eq!(err, PoolError::CooldownActive { remaining_secs: 1 });

        pool.advance_time(1);
        assert!(pool.withdraw(ALICE, Shares::new(dec!(1))).is_ok());
    }

    #[test]
    fn withdraw_more_shares_than_owned() {
        let mut pool = funded_pool();
        pool.deposit(ALICE, Amount::new(dec!(10000))).unwrap();
        pool.advance_time(DAY);

        let err = pool.withdraw(BOB, Shares::new(dec!(1))).unwrap_err();
        assert!(matches!(err, PoolError::InsufficientShares { .. }));
    }

    #[test]
    fn withdrawal_below_protection_sold_fails_without_effect() {
        let mut pool = funded_pool();
        pool.deposit(ALICE, Amount::new(dec!(1000000))).unwrap();
        pool.buy_protection(BUYER, Amount::new(dec!(900000)), Amount::new(dec!(1000000))).unwrap();
        pool.advance_time(DAY);
        pool.accrue_all_premiums().unwrap();

        let assets = pool.total_assets().unwrap();
        let shares = pool.shares_of(ALICE);
        let err = pool.withdraw(ALICE, Shares::new(dec!(200000))).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Undercollateralized);
        assert_eq!(pool.shares_of(ALICE), shares);
        assert_eq!(pool.total_assets().unwrap(), assets);
    }

    #[test]
    fn last_withdrawal_empties_pool() {
        let mut pool = funded_pool();
        pool.deposit(ALICE, Amount::new(dec!(5000))).unwrap();
        pool.advance_time(DAY);

        let shares = pool.shares_of(ALICE);
        let result = pool.withdraw(ALICE, shares).unwrap();
        assert_eq!(result.amount_out, Amount::new(dec!(5000)));
        assert!(pool.total_assets().unwrap().is_zero());
        assert!(pool.total_shares().is_zero());
    }

    #[test]
    fn deposit_stops_at_asset_ceiling() {
        let mut pool = funded_pool();
        pool.config.max_total_assets = Amount::new(dec!(2000000));
        pool.deposit(ALICE, Amount::new(dec!(1500000))).unwrap();
        pool.deposit(BOB, Amount::new(dec!(500000))).unwrap();
        assert_eq!(pool.asset().vault_balance(), Amount::new(dec!(2000000)));

        let before = pool.snapshot();
        let err = pool
            .deposit(BOB, Amount::new(dec!(0.000000000000000001)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(pool.snapshot(), before);
        assert_eq!(pool.asset().vault_balance(), Amount::new(dec!(2000000)));
    }
}
