// 8.0: pool engine. coordinates deposits, withdrawals, protection sales, premium accrual,
// credit event settlement and expiry. deterministic, time is set by the caller.
// each mutating operation commits fully or not at all.

mod accrual;
mod config;
mod core;
mod lifecycle;
mod liquidity;
mod protection;
mod results;
mod state;
#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use core::{Pool, PoolSnapshot};
pub use results::{
    AccrualResult, BuyResult, CloseResult, DepositResult, ErrorKind, ExpiryResult, PoolError, SettlementResult,
    WithdrawResult,
};
pub use state::{AccrualPreview, PoolState};
