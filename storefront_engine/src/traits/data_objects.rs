use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Hold, HoldItem, OrderId, ReservationStatus};

/// Everything the ledger needs to place a hold. Timestamps are supplied by the caller so that the ledger never reads
/// the wall clock itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldRequest {
    pub order_id: OrderId,
    pub items: Vec<HoldItem>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl HoldRequest {
    pub fn new(order_id: OrderId, items: Vec<HoldItem>, created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self { order_id, items, created_at, expires_at }
    }

    pub fn total_units(&self) -> i64 {
        self.items.iter().map(|i| i.qty).sum()
    }
}

/// The result of a successful `create_hold`, along with any stale holds that were reclaimed before the capacity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldPlaced {
    pub hold: Hold,
    pub expired: Vec<Hold>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    /// Stock was deducted and the reservation is now `paid`.
    Committed,
    /// The reservation had already been paid. Nothing changed.
    AlreadyPaid,
}

impl Display for CommitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitOutcome::Committed => write!(f, "committed"),
            CommitOutcome::AlreadyPaid => write!(f, "already paid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub outcome: CommitOutcome,
    pub hold: Hold,
    pub expired: Vec<Hold>,
}

impl CommitResult {
    pub fn is_fresh_commit(&self) -> bool {
        matches!(self.outcome, CommitOutcome::Committed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseOutcome {
    /// The hold was active and its units have been returned to the pool.
    Released(Hold),
    /// The reservation was already terminal (with the given status), so nothing changed.
    NotActive(ReservationStatus),
    /// There is no reservation for the order.
    NotFound,
}

impl ReleaseOutcome {
    pub fn released(&self) -> Option<&Hold> {
        match self {
            ReleaseOutcome::Released(hold) => Some(hold),
            _ => None,
        }
    }
}
