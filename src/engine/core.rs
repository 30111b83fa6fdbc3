// 8.0 engine/core.rs: the pool. owns terms, config, state, the vault asset and the event reporter.

use super::config::EngineConfig;
use super::results::PoolError;
use super::state::PoolState;
use crate::config::{PoolConfig, PoolTerms};
use crate::credit_feed::CreditEventSource;
use crate::custody::SettlementAsset;
use crate::events::{Event, EventId, EventPayload, StatusChangedEvent};
use crate::fixed::MathError;
use crate::position::Position;
use crate::pricing::{self, PremiumQuote};
use crate::settlement::PoolStatus;
use crate::types::{AccountId, Amount, PositionId, Rate, Shares, Timestamp};
use serde::{Deserialize, Serialize};

/** 8.1: main pool struct. all state lives here */
#[derive(Debug)]
pub struct Pool<A: SettlementAsset, E: CreditEventSource> {
    pub(super) terms: PoolTerms,
    pub(super) config: PoolConfig,
    pub(super) engine_config: EngineConfig,
    pub(super) state: PoolState,
    pub(super) asset: A,
    pub(super) event_source: E,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
    // set for the whole of a mutating call, external transfer included
    pub(super) in_flight: bool,
}

/// Serializable pool state, without the vault asset or the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub terms: PoolTerms,
    pub config: PoolConfig,
    pub state: PoolState,
    pub next_event_id: u64,
    pub taken_at: Timestamp,
}

// 8.2: the one external transfer an operation may stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Transfer {
    Pull { from: AccountId, amount: Amount },
    Push { to: AccountId, amount: Amount },
}

// 8.3: working copy of the state for one operation. dropped on any error
pub(super) struct Draft<'a> {
    pub(super) state: PoolState,
    pub(super) terms: &'a PoolTerms,
    pub(super) config: &'a PoolConfig,
    pub(super) now: Timestamp,
    events: Vec<EventPayload>,
    transfer: Option<Transfer>,
}

impl Draft<'_> {
    pub(super) fn require_status(&self, expected: PoolStatus, operation: &'static str) -> Result<(), PoolError> {
        if self.state.status != expected {
            return Err(PoolError::WrongState {
                operation,
                status: self.state.status,
            });
        }
        Ok(())
    }

    pub(super) fn require_before_maturity(&self) -> Result<(), PoolError> {
        if self.now >= self.terms.maturity {
            return Err(PoolError::PoolMatured {
                maturity: self.terms.maturity,
            });
        }
        Ok(())
    }

    // 8.3.1: custody stays under the configured ceiling after `incoming` arrives
    pub(super) fn require_within_ceiling(&self, incoming: Amount) -> Result<(), PoolError> {
        let after = self
            .state
            .custody_owed()?
            .checked_add(incoming)
            .ok_or(MathError::Overflow)?;
        if after > self.config.max_total_assets {
            return Err(PoolError::invalid(format!(
                "custody {} would exceed ceiling {}",
                after, self.config.max_total_assets
            )));
        }
        Ok(())
    }

    pub(super) fn pull(&mut self, from: AccountId, amount: Amount) -> Result<(), PoolError> {
        self.stage(Transfer::Pull { from, amount })
    }

    pub(super) fn push(&mut self, to: AccountId, amount: Amount) -> Result<(), PoolError> {
        self.stage(Transfer::Push { to, amount })
    }

    fn stage(&mut self, transfer: Transfer) -> Result<(), PoolError> {
        if self.transfer.is_some() {
            return Err(PoolError::InvariantViolated("second transfer staged".to_string()));
        }
        self.transfer = Some(transfer);
        Ok(())
    }

    pub(super) fn emit(&mut self, payload: EventPayload) {
        self.events.push(payload);
    }

    pub(super) fn transition(&mut self, next: PoolStatus, operation: &'static str) -> Result<(), PoolError> {
        let from = self.state.status;
        if !from.can_transition_to(next) {
            return Err(PoolError::WrongState { operation, status: from });
        }
        self.state.status = next;
        self.emit(EventPayload::StatusChanged(StatusChangedEvent { from, to: next }));
        Ok(())
    }
}

impl<A: SettlementAsset, E: CreditEventSource> Pool<A, E> {
    pub fn new(
        terms: PoolTerms,
        config: PoolConfig,
        engine_config: EngineConfig,
        asset: A,
        event_source: E,
        created_at: Timestamp,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        terms.validate(created_at)?;
        if asset.asset_id() != &terms.settlement_asset {
            return Err(PoolError::invalid(format!(
                "vault holds {} but pool settles in {}",
                asset.asset_id(),
                terms.settlement_asset
            )));
        }
        if event_source.source_id() != &terms.event_source {
            return Err(PoolError::invalid(format!(
                "reporter {} is not the pool's event source {}",
                event_source.source_id(),
                terms.event_source
            )));
        }

        tracing::info!(
            reference = %terms.reference_asset,
            settlement = %terms.settlement_asset,
            maturity = %terms.maturity,
            "pool created"
        );

        Ok(Self {
            terms,
            config,
            engine_config,
            state: PoolState::new(created_at),
            asset,
            event_source,
            events: Vec::new(),
            next_event_id: 1,
            current_time: created_at,
            in_flight: false,
        })
    }

    pub fn restore(
        snapshot: PoolSnapshot,
        engine_config: EngineConfig,
        asset: A,
        event_source: E,
        now: Timestamp,
    ) -> Result<Self, PoolError> {
        snapshot.config.validate()?;
        snapshot
            .state
            .check_invariants(&snapshot.config)
            .map_err(PoolError::InvariantViolated)?;
        if asset.asset_id() != &snapshot.terms.settlement_asset {
            return Err(PoolError::invalid("vault asset does not match snapshot terms"));
        }
        if event_source.source_id() != &snapshot.terms.event_source {
            return Err(PoolError::invalid("reporter does not match snapshot terms"));
        }

        Ok(Self {
            terms: snapshot.terms,
            config: snapshot.config,
            engine_config,
            state: snapshot.state,
            asset,
            event_source,
            events: Vec::new(),
            next_event_id: snapshot.next_event_id,
            current_time: now.max(snapshot.taken_at),
            in_flight: false,
        })
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            terms: self.terms.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            next_event_id: self.next_event_id,
            taken_at: self.current_time,
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: i64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    // 8.4: read-only queries. these report committed state, pending accrual excluded

    pub fn terms(&self) -> &PoolTerms {
        &self.terms
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.state.status
    }

    pub fn total_assets(&self) -> Result<Amount, PoolError> {
        Ok(self.state.total_assets()?)
    }

    pub fn total_deposits(&self) -> Amount {
        self.state.total_deposits
    }

    pub fn total_premiums_earned(&self) -> Amount {
        self.state.total_premiums_earned
    }

    pub fn total_protection_sold(&self) -> Amount {
        self.state.book.total_protection_sold()
    }

    pub fn total_shares(&self) -> Shares {
        self.state.ledger.total_shares()
    }

    pub fn shares_of(&self, holder: AccountId) -> Shares {
        self.state.ledger.shares_of(holder)
    }

    pub fn utilization_rate(&self) -> Result<Rate, PoolError> {
        Ok(self.state.utilization()?)
    }

    pub fn current_spread(&self) -> Result<Rate, PoolError> {
        let curve = self.terms.curve(&self.config);
        Ok(pricing::spread(self.utilization_rate()?, &curve)?)
    }

    pub fn convert_to_shares(&self, assets: Amount) -> Result<Shares, PoolError> {
        Ok(self.state.ledger.convert_to_shares(assets, self.total_assets()?)?)
    }

    pub fn convert_to_assets(&self, shares: Shares) -> Result<Amount, PoolError> {
        Ok(self.state.ledger.convert_to_assets(shares, self.total_assets()?)?)
    }

    /// Premium `buy_protection(notional, ..)` would charge right now, pending accrual included.
    pub fn quote_protection(&self, notional: Amount) -> Result<PremiumQuote, PoolError> {
        if self.state.status != PoolStatus::Active {
            return Err(PoolError::WrongState {
                operation: "quote_protection",
                status: self.state.status,
            });
        }
        if self.current_time >= self.terms.maturity {
            return Err(PoolError::PoolMatured {
                maturity: self.terms.maturity,
            });
        }
        if !notional.is_positive() {
            return Err(PoolError::invalid(format!("notional must be positive, got {}", notional)));
        }

        let preview = self.state.preview_accrual(self.current_time, &self.terms, &self.config)?;
        let liquidity = self
            .state
            .total_assets()?
            .checked_add(preview.net)
            .ok_or(MathError::Overflow)?;
        let tenor = self.current_time.secs_until(self.terms.maturity);
        Ok(pricing::quote_premium(
            notional,
            liquidity,
            self.state.book.total_protection_sold(),
            &self.terms.curve(&self.config),
            tenor,
        )?)
    }

    pub fn get_position(&self, id: PositionId) -> Option<&Position> {
        self.state.book.get(id)
    }

    pub fn active_positions(&self) -> impl Iterator<Item = &Position> {
        self.state.book.active_positions()
    }

    pub fn unearned_premiums(&self) -> Amount {
        self.state.book.unearned_premiums()
    }

    pub fn claimable(&self, holder: AccountId) -> Amount {
        self.state.claims.claimable(holder)
    }

    pub fn outstanding_claims(&self) -> Amount {
        self.state.claims.outstanding()
    }

    pub fn fees_owed(&self) -> Amount {
        self.state.fees_owed
    }

    pub fn last_accrual(&self) -> Timestamp {
        self.state.last_accrual
    }

    pub fn asset(&self) -> &A {
        &self.asset
    }

    pub fn asset_mut(&mut self) -> &mut A {
        &mut self.asset
    }

    pub fn event_source(&self) -> &E {
        &self.event_source
    }

    pub fn event_source_mut(&mut self) -> &mut E {
        &mut self.event_source
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // 8.5: every mutating entry point runs through here. checks and mutations happen on a
    // draft, invariants are verified, then the staged transfer runs and the draft commits.
    pub(super) fn transact<T>(
        &mut self,
        operation: &'static str,
        body: impl FnOnce(&mut Draft<'_>) -> Result<T, PoolError>,
    ) -> Result<T, PoolError> {
        if self.in_flight {
            tracing::warn!(operation, "re-entrant call rejected");
            return Err(PoolError::OperationInProgress);
        }
        self.in_flight = true;
        let result = self.run(operation, body);
        self.in_flight = false;

        if let Err(ref e) = result {
            tracing::warn!(operation, error = %e, "operation rejected");
        }
        result
    }

    fn run<T>(
        &mut self,
        operation: &'static str,
        body: impl FnOnce(&mut Draft<'_>) -> Result<T, PoolError>,
    ) -> Result<T, PoolError> {
        let mut draft = Draft {
            state: self.state.clone(),
            terms: &self.terms,
            config: &self.config,
            now: self.current_time,
            events: Vec::new(),
            transfer: None,
        };
        let output = body(&mut draft)?;
        let Draft {
            state, events, transfer, ..
        } = draft;

        state.check_invariants(&self.config).map_err(|detail| {
            tracing::error!(operation, %detail, "invariant check failed, rolling back");
            PoolError::InvariantViolated(detail)
        })?;

        if let Some(transfer) = transfer {
            self.execute(transfer)?;
        }

        self.state = state;
        for payload in events {
            self.emit_event(payload);
        }
        Ok(output)
    }

    fn execute(&mut self, transfer: Transfer) -> Result<(), PoolError> {
        match transfer {
            Transfer::Pull { amount, .. } | Transfer::Push { amount, .. } if amount.is_zero() => Ok(()),
            Transfer::Pull { from, amount } => Ok(self.asset.pull(from, amount)?),
            Transfer::Push { to, amount } => Ok(self.asset.push(to, amount)?),
        }
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        tracing::debug!(id = event.id.0, kind = event.payload.kind(), payload = ?event.payload, "event");

        self.events.push(event);

        if self.events.len() > self.engine_config.max_events {
            let drain_count = self.events.len() - self.engine_config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
