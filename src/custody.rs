// 9.2 custody.rs: settlement-asset transfers. the pool only sees the trait.
// TokenLedger is the in-memory implementation used by tests and the sim.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AccountId, Amount, AssetId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("Insufficient {asset} balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        asset: AssetId,
        account: AccountId,
        requested: Amount,
        available: Amount,
    },

    #[error("Recipient {0} rejected the transfer")]
    Rejected(AccountId),

    #[error("Invalid transfer amount {0}")]
    InvalidAmount(Amount),
}

/// Fungible settlement asset as seen from a pool's vault.
pub trait SettlementAsset {
    fn asset_id(&self) -> &AssetId;

    /// Move `amount` from `from` into the pool vault.
    fn pull(&mut self, from: AccountId, amount: Amount) -> Result<(), TransferError>;

    /// Move `amount` from the pool vault to `to`.
    fn push(&mut self, to: AccountId, amount: Amount) -> Result<(), TransferError>;

    fn vault_balance(&self) -> Amount;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLedger {
    asset: AssetId,
    vault: AccountId,
    balances: BTreeMap<AccountId, Amount>,
    // recipients whose receive hook fails, for griefing tests
    blocked: BTreeSet<AccountId>,
}

impl TokenLedger {
    pub fn new(asset: AssetId, vault: AccountId) -> Self {
        Self {
            asset,
            vault,
            balances: BTreeMap::new(),
            blocked: BTreeSet::new(),
        }
    }

    pub fn balance_of(&self, account: AccountId) -> Amount {
        self.balances.get(&account).copied().unwrap_or(Amount::ZERO)
    }

    pub fn mint(&mut self, to: AccountId, amount: Amount) {
        let balance = Amount::new(self.balance_of(to).value() + amount.value());
        self.balances.insert(to, balance);
    }

    pub fn block(&mut self, account: AccountId) {
        self.blocked.insert(account);
    }

    pub fn unblock(&mut self, account: AccountId) {
        self.blocked.remove(&account);
    }

    pub fn total_supply(&self) -> Amount {
        self.balances.values().copied().sum()
    }

    fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<(), TransferError> {
        if amount.value() < Decimal::ZERO {
            return Err(TransferError::InvalidAmount(amount));
        }
        if self.blocked.contains(&to) {
            return Err(TransferError::Rejected(to));
        }
        let available = self.balance_of(from);
        let remaining = available.checked_sub(amount).filter(|r| r.value() >= Decimal::ZERO).ok_or_else(|| {
            TransferError::InsufficientBalance {
                asset: self.asset.clone(),
                account: from,
                requested: amount,
                available,
            }
        })?;
        if from == to {
            return Ok(());
        }
        let credited = Amount::new(self.balance_of(to).value() + amount.value());
        self.balances.insert(from, remaining);
        self.balances.insert(to, credited);
        Ok(())
    }
}

impl SettlementAsset for TokenLedger {
    fn asset_id(&self) -> &AssetId {
        &self.asset
    }

    fn pull(&mut self, from: AccountId, amount: Amount) -> Result<(), TransferError> {
        let vault = self.vault;
        self.transfer(from, vault, amount)
    }

    fn push(&mut self, to: AccountId, amount: Amount) -> Result<(), TransferError> {
        let vault = self.vault;
        self.transfer(vault, to, amount)
    }

    fn vault_balance(&self) -> Amount {
        self.balance_of(self.vault)
    }
}
