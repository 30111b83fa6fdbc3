//! Liquidity provider share ledger.
//!
//! Shares are a proportional claim on pool assets. A share is worth
//! `total_assets / total_shares`, and shares only change through mint (deposit)
//! and burn (withdraw). The ledger does not know what total assets are; the
//! pool passes its current figure into every conversion.

use crate::fixed::{self, MathError, Rounding};
use crate::types::{AccountId, Amount, Shares, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("First deposit {amount} below minimum {minimum}")]
    InitialDepositTooSmall { amount: Amount, minimum: Amount },

    #[error("Deposit of {0} mints zero shares")]
    DepositTooSmall(Amount),

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: Shares, available: Shares },

    #[error("Withdrawal cooldown active for another {remaining_secs}s")]
    CooldownActive { remaining_secs: i64 },

    #[error("Ledger math: {0}")]
    Math(#[from] MathError),
}

/// How a withdrawal's payout splits across the pool's two asset buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalSplit {
    pub amount_out: Amount,
    pub from_deposits: Amount,
    pub from_premiums: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLedger {
    balances: BTreeMap<AccountId, Shares>,
    total_shares: Shares,
    last_deposit: BTreeMap<AccountId, Timestamp>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shares_of(&self, holder: AccountId) -> Shares {
        self.balances.get(&holder).copied().unwrap_or(Shares::ZERO)
    }

    pub fn total_shares(&self) -> Shares {
        self.total_shares
    }

    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Shares)> {
        self.balances.iter()
    }

    pub fn last_deposit_at(&self, holder: AccountId) -> Option<Timestamp> {
        self.last_deposit.get(&holder).copied()
    }

    // 1:1 on an empty pool
    pub fn convert_to_shares(&self, assets: Amount, total_assets: Amount) -> Result<Shares, MathError> {
        if self.total_shares.is_zero() || !total_assets.is_positive() {
            return Ok(Shares::new(assets.round(Rounding::Down).value()));
        }
        fixed::mul_div(assets.value(), self.total_shares.value(), total_assets.value(), Rounding::Down).map(Shares::new)
    }

    pub fn convert_to_assets(&self, shares: Shares, total_assets: Amount) -> Result<Amount, MathError> {
        if self.total_shares.is_zero() {
            return Ok(Amount::ZERO);
        }
        // the last holder out takes everything, no dust left behind
        if shares == self.total_shares {
            return Ok(total_assets);
        }
        fixed::mul_div(shares.value(), total_assets.value(), self.total_shares.value(), Rounding::Down).map(Amount::new)
    }

    pub fn preview_mint(&self, amount: Amount, total_assets: Amount, minimum_initial: Amount) -> Result<Shares, LedgerError> {
        if self.total_shares.is_zero() && amount < minimum_initial {
            return Err(LedgerError::InitialDepositTooSmall {
                amount,
                minimum: minimum_initial,
            });
        }
        let shares = self.convert_to_shares(amount, total_assets)?;
        if !shares.is_positive() {
            return Err(LedgerError::DepositTooSmall(amount));
        }
        Ok(shares)
    }

    pub fn check_cooldown(&self, holder: AccountId, now: Timestamp, cooldown_secs: i64) -> Result<(), LedgerError> {
        let Some(last) = self.last_deposit_at(holder) else {
            return Ok(());
        };
        let elapsed = last.secs_until(now);
        if elapsed < cooldown_secs {
            return Err(LedgerError::CooldownActive {
                remaining_secs: cooldown_secs - elapsed,
            });
        }
        Ok(())
    }

    // splits the payout in the same proportion as deposits:premiums inside total assets
    pub fn preview_withdraw(
        &self,
        holder: AccountId,
        shares: Shares,
        total_deposits: Amount,
        total_premiums: Amount,
    ) -> Result<WithdrawalSplit, LedgerError> {
        let available = self.shares_of(holder);
        if shares > available {
            return Err(LedgerError::InsufficientShares {
                requested: shares,
                available,
            });
        }

        let total_assets = total_deposits.checked_add(total_premiums).ok_or(MathError::Overflow)?;
        let amount_out = self.convert_to_assets(shares, total_assets)?;

        if amount_out == total_assets {
            return Ok(WithdrawalSplit {
                amount_out,
                from_deposits: total_deposits,
                from_premiums: total_premiums,
            });
        }

        let from_deposits = if total_assets.is_positive() {
            Amount::new(fixed::mul_div(
                amount_out.value(),
                total_deposits.value(),
                total_assets.value(),
                Rounding::Down,
            )?)
        } else {
            Amount::ZERO
        };
        // the rounding remainder comes out of premiums, capped so neither bucket goes negative
        let from_premiums = amount_out.saturating_sub(from_deposits).min(total_premiums);

        Ok(WithdrawalSplit {
            amount_out: from_deposits.checked_add(from_premiums).ok_or(MathError::Overflow)?,
            from_deposits,
            from_premiums,
        })
    }

    pub fn mint(&mut self, holder: AccountId, shares: Shares, now: Timestamp) -> Result<(), LedgerError> {
        let balance = self.shares_of(holder).checked_add(shares).ok_or(MathError::Overflow)?;
        let total = self.total_shares.checked_add(shares).ok_or(MathError::Overflow)?;
        self.balances.insert(holder, balance);
        self.total_shares = total;
        self.last_deposit.insert(holder, now);
        Ok(())
    }

    pub fn burn(&mut self, holder: AccountId, shares: Shares) -> Result<(), LedgerError> {
        let available = self.shares_of(holder);
        if shares > available {
            return Err(LedgerError::InsufficientShares {
                requested: shares,
                available,
            });
        }
        let remaining = available.checked_sub(shares).ok_or(MathError::Overflow)?;
        self.total_shares = self.total_shares.checked_sub(shares).ok_or(MathError::Overflow)?;
        if remaining.is_zero() {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, remaining);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);

    fn amt(v: rust_decimal::Decimal) -> Amount {
        Amount::new(v)
    }

    #[test]
    fn first_deposit_mints_one_to_one() {
        let ledger = ShareLedger::new();
        let shares = ledger.preview_mint(amt(dec!(750000)), Amount::ZERO, amt(dec!(1000))).unwrap();
        assert_eq!(shares, Shares::new(dec!(750000)));
    }

    #[test]
    fn first_deposit_below_floor_rejected() {
        let ledger = ShareLedger::new();
        let result = ledger.preview_mint(amt(dec!(999)), Amount::ZERO, amt(dec!(1000)));
        assert!(matches!(result, Err(LedgerError::InitialDepositTooSmall { .. })));
    }

    #[test]
    fn later_deposit_priced_at_share_value() {
        let mut ledger = ShareLedger::new();
        ledger.mint(ALICE, Shares::new(dec!(1000)), Timestamp::from_secs(0)).unwrap();

        // pool grew to 2000 assets, so 1 share = 2 units
        let shares = ledger.preview_mint(amt(dec!(500)), amt(dec!(2000)), amt(dec!(1000))).unwrap();
        assert_eq!(shares, Shares::new(dec!(250)));
    }

    #[test]
    fn dust_deposit_minting_nothing_rejected() {
        let mut ledger = ShareLedger::new();
        ledger.mint(ALICE, Shares::new(dec!(1)), Timestamp::from_secs(0)).unwrap();

        let result = ledger.preview_mint(amt(dec!(0.000000000000000001)), amt(dec!(1000000000)), Amount::ZERO);
        assert!(matches!(result, Err(LedgerError::DepositTooSmall(_))));
    }

    #[test]
    fn cooldown_blocks_until_elapsed() {
        let mut ledger = ShareLedger::new();
        ledger.mint(ALICE, Shares::new(dec!(10)), Timestamp::from_secs(100)).unwrap();

        let early = ledger.check_cooldown(ALICE, Timestamp::from_secs(150), 100);
        assert_eq!(early, Err(LedgerError::CooldownActive { remaining_secs: 50 }));
        assert!(ledger.check_cooldown(ALICE, Timestamp::from_secs(200), 100).is_ok());
        assert!(ledger.check_cooldown(BOB, Timestamp::from_secs(0), 100).is_ok());
    }

    #[test]
    fn withdraw_split_follows_asset_composition() {
        let mut ledger = ShareLedger::new();
        ledger.mint(ALICE, Shares::new(dec!(750)), Timestamp::from_secs(0)).unwrap();
        ledger.mint(BOB, Shares::new(dec!(250)), Timestamp::from_secs(0)).unwrap();

        // 1000 deposits + 100 premiums, bob owns a quarter
        let split = ledger.preview_withdraw(BOB, Shares::new(dec!(250)), amt(dec!(1000)), amt(dec!(100))).unwrap();
        assert_eq!(split.amount_out, amt(dec!(275)));
        assert_eq!(split.from_deposits, amt(dec!(250)));
        assert_eq!(split.from_premiums, amt(dec!(25)));
    }

    #[test]
    fn last_holder_takes_everything() {
        let mut ledger = ShareLedger::new();
        ledger.mint(ALICE, Shares::new(dec!(3)), Timestamp::from_secs(0)).unwrap();

        let split = ledger.preview_withdraw(ALICE, Shares::new(dec!(3)), amt(dec!(10)), amt(dec!(0.1))).unwrap();
        assert_eq!(split.amount_out, amt(dec!(10.1)));
        assert_eq!(split.from_deposits, amt(dec!(10)));
        assert_eq!(split.from_premiums, amt(dec!(0.1)));
    }

    #[test]
    fn burn_more_than_owned_fails() {
        let mut ledger = ShareLedger::new();
        ledger.mint(ALICE, Shares::new(dec!(5)), Timestamp::from_secs(0)).unwrap();

        assert!(matches!(
            ledger.burn(ALICE, Shares::new(dec!(6))),
            Err(LedgerError::InsufficientShares { .. })
        ));
        ledger.burn(ALICE, Shares::new(dec!(5))).unwrap();
        assert!(ledger.total_shares().is_zero());
        assert_eq!(ledger.holders().count(), 0);
    }
}
