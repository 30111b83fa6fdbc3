// 11.0: every committed state change produces an event. used for audit trails and for
// notifying the registry and routing layers. rejected operations produce none.

use crate::position::CloseReason;
use crate::settlement::PoolStatus;
use crate::types::{AccountId, Amount, AssetId, PositionId, Rate, Shares, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Liquidity events
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),

    // Protection events
    ProtectionBought(ProtectionBoughtEvent),
    ProtectionClosed(ProtectionClosedEvent),
    PremiumsAccrued(PremiumsAccruedEvent),

    // Lifecycle events
    StatusChanged(StatusChangedEvent),
    CreditEventTriggered(CreditEventTriggeredEvent),
    PoolSettled(PoolSettledEvent),
    PoolExpired(PoolExpiredEvent),

    // Payout events
    SettlementClaimed(SettlementClaimedEvent),
    FeesCollected(FeesCollectedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub holder: AccountId,
    pub amount: Amount,
    pub shares_minted: Shares,
    pub total_assets: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub holder: AccountId,
    pub shares_burned: Shares,
    pub amount_out: Amount,
    pub from_deposits: Amount,
    pub from_premiums: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionBoughtEvent {
    pub position_id: PositionId,
    pub buyer: AccountId,
    pub notional: Amount,
    pub premium: Amount,
    pub locked_spread: Rate,
    pub utilization_after: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionClosedEvent {
    pub position_id: PositionId,
    pub buyer: AccountId,
    pub reason: CloseReason,
    pub earned_premium: Amount,
    pub refund: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumsAccruedEvent {
    pub elapsed_secs: i64,
    pub positions: usize,
    pub gross: Amount,
    pub protocol_fee: Amount,
    pub net: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    pub from: PoolStatus,
    pub to: PoolStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEventTriggeredEvent {
    pub reference_asset: AssetId,
    pub protection_outstanding: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettledEvent {
    pub recovery_rate: Rate,
    pub positions_settled: usize,
    pub total_liability: Amount,
    pub total_payout: Amount,
    pub pro_rata: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolExpiredEvent {
    pub positions_lapsed: usize,
    pub residual_premium: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementClaimedEvent {
    pub holder: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesCollectedEvent {
    pub fee_sink: AccountId,
    pub amount: Amount,
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Deposit(_) => "deposit",
            EventPayload::Withdrawal(_) => "withdrawal",
            EventPayload::ProtectionBought(_) => "protection_bought",
            EventPayload::ProtectionClosed(_) => "protection_closed",
            EventPayload::PremiumsAccrued(_) => "premiums_accrued",
            EventPayload::StatusChanged(_) => "status_changed",
            EventPayload::CreditEventTriggered(_) => "credit_event_triggered",
            EventPayload::PoolSettled(_) => "pool_settled",
            EventPayload::PoolExpired(_) => "pool_expired",
            EventPayload::SettlementClaimed(_) => "settlement_claimed",
            EventPayload::FeesCollected(_) => "fees_collected",
        }
    }
}
