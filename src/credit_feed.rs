// Credit Event Feed Integration
//
// This module abstracts how the engine learns that a credit event happened. The pool is
// agnostic to whether the signal comes from a determinations committee, an on-chain
// reporter, or a multisig. Any reporter implements CreditEventSource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{AssetId, Timestamp};

/// Read-only view of a credit event reporter.
pub trait CreditEventSource {
    /// Identifier a pool's terms name this reporter by.
    fn source_id(&self) -> &AssetId;

    /// Whether an event is currently reported for `reference_asset`.
    fn has_active_event(&self, reference_asset: &AssetId) -> bool;
}

/// Kind of credit event, as a reporter would classify it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditEventKind {
    FailureToPay,
    Bankruptcy,
    Restructuring,
}

/// A single report from a reporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEventReport {
    pub reference_asset: AssetId,
    pub kind: CreditEventKind,
    pub reported_at: Timestamp,
    /// Set when the reporter withdraws a report (e.g. a cured missed payment)
    pub retracted_at: Option<Timestamp>,
}

impl CreditEventReport {
    pub fn is_active(&self) -> bool {
        self.retracted_at.is_none()
    }
}

/// In-memory reporter. Keeps the latest report per reference asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockCreditFeed {
    source: AssetId,
    reports: BTreeMap<AssetId, CreditEventReport>,
}

impl MockCreditFeed {
    pub fn new(source: AssetId) -> Self {
        Self {
            source,
            reports: BTreeMap::new(),
        }
    }

    pub fn report(&mut self, reference_asset: AssetId, kind: CreditEventKind, at: Timestamp) {
        self.reports.insert(
            reference_asset.clone(),
            CreditEventReport {
                reference_asset,
                kind,
                reported_at: at,
                retracted_at: None,
            },
        );
    }

    pub fn retract(&mut self, reference_asset: &AssetId, at: Timestamp) {
        if let Some(report) = self.reports.get_mut(reference_asset) {
            report.retracted_at = Some(at);
        }
    }

    pub fn latest(&self, reference_asset: &AssetId) -> Option<&CreditEventReport> {
        self.reports.get(reference_asset)
    }
}

impl CreditEventSource for MockCreditFeed {
    fn source_id(&self) -> &AssetId {
        &self.source
    }

    fn has_active_event(&self, reference_asset: &AssetId) -> bool {
        self.latest(reference_asset).is_some_and(CreditEventReport::is_active)
    }
}
