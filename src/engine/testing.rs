// fixtures shared by the engine unit tests

use super::{EngineConfig, Pool};
use crate::config::{PoolConfig, PoolTerms};
use crate::credit_feed::MockCreditFeed;
use crate::custody::TokenLedger;
use crate::types::{AccountId, Amount, AssetId, Rate, Timestamp, SECONDS_PER_YEAR};
use rust_decimal_macros::dec;

pub const ALICE: AccountId = AccountId(1);
pub const BOB: AccountId = AccountId(2);
pub const BUYER: AccountId = AccountId(10);
pub const AUTHORITY: AccountId = AccountId(900);
pub const FEE_SINK: AccountId = AccountId(901);
pub const VAULT: AccountId = AccountId(1000);

pub const START: i64 = 1_700_000_000;

pub fn terms() -> PoolTerms {
    PoolTerms {
        reference_asset: AssetId::new("ACME-2027-SR"),
        settlement_asset: AssetId::new("USDC"),
        event_source: AssetId::new("isda-dc"),
        maturity: Timestamp::from_secs(START + SECONDS_PER_YEAR),
        base_spread: Rate::new(dec!(0.02)),
        slope: Rate::new(dec!(0.10)),
    }
}

pub fn funded_pool() -> Pool<TokenLedger, MockCreditFeed> {
    let mut ledger = TokenLedger::new(AssetId::new("USDC"), VAULT);
    for account in [ALICE, BOB, BUYER] {
        ledger.mint(account, Amount::new(dec!(100000000)));
    }
    Pool::new(
        terms(),
        PoolConfig::default().with_authorities(FEE_SINK, AUTHORITY),
        EngineConfig::default(),
        ledger,
        MockCreditFeed::new(AssetId::new("isda-dc")),
        Timestamp::from_secs(START),
    )
    .unwrap()
}
