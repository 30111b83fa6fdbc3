// protection-core: credit protection AMM.
// LPs pool one settlement asset, buyers pay a utilization-priced premium for a payout
// if the reference debt suffers a credit event before maturity. solvency first:
// the pool never sells more protection than its assets back.
// all computation is deterministic, time is supplied by the caller.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, PositionId, Amount, Shares, Rate, Timestamp
//   1.5x fixed.rs: checked mul/div with explicit rounding, WAD bridging
//   2.x  pricing.rs: utilization curve, premium quote
//   3.x  ledger.rs: LP share ledger, cooldown, withdrawal split
//   4.x  position.rs: protection positions, active-set arena, accrual plan
//   5.x  settlement.rs: pool status machine, pull claims, payout allocation
//   7.x  config.rs: pool tunables, terms, env presets
//   8.x  engine/: pool orchestrator: transactions, ops, queries
//   9.1  credit_feed.rs: credit event reporter (mocked)
//   9.2  custody.rs: settlement asset transfers (mocked)
//   9.3  shared.rs: single-lock handle for threaded hosts
//   11.x events.rs: state transition events for audit

// core modules
pub mod engine;
pub mod events;
pub mod fixed;
pub mod ledger;
pub mod position;
pub mod pricing;
pub mod settlement;
pub mod types;

// integration modules
pub mod config;
pub mod credit_feed;
pub mod custody;
pub mod shared;

// re exports for convenience
pub use engine::*;
pub use events::*;
pub use position::*;
pub use types::*;
pub use config::{ConfigError, Environment, PoolConfig, PoolTerms, MAX_PROTOCOL_FEE_BPS, MAX_TOTAL_ASSETS};
pub use credit_feed::{CreditEventKind, CreditEventReport, CreditEventSource, MockCreditFeed};
pub use custody::{SettlementAsset, TokenLedger, TransferError};
pub use fixed::{MathError, Rounding};
pub use ledger::{LedgerError, ShareLedger, WithdrawalSplit};
pub use pricing::{CurveParams, PremiumQuote, PricingError};
pub use settlement::{ClaimBook, PoolStatus};
pub use shared::SharedPool;
