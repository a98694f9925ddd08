use serde::{Deserialize, Serialize};

use crate::db_types::{Hold, Order, OrderId, ReservationStatus};

/// Published once per order, after the transaction that deducted its stock has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub hold: Hold,
}

impl OrderPaidEvent {
    pub fn new(order: Order, hold: Hold) -> Self {
        Self { order, hold }
    }
}

/// Published when a hold returns its units to the pool, either because it expired or because the payment failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldReleasedEvent {
    pub hold: Hold,
}

impl HoldReleasedEvent {
    pub fn new(hold: Hold) -> Self {
        Self { hold }
    }

    pub fn order_id(&self) -> &OrderId {
        &self.hold.reservation.order_id
    }

    pub fn status(&self) -> &ReservationStatus {
        &self.hold.reservation.status
    }

    pub fn units(&self) -> i64 {
        self.hold.items.iter().map(|i| i.qty).sum()
    }
}
