use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Hold, OrderId, ReservationStatus, Sku},
    traits::data_objects::{CommitResult, HoldPlaced, HoldRequest, ReleaseOutcome},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("The requested SKU {0} does not exist")]
    SkuNotFound(Sku),
    #[error("Not enough stock for {sku}. {requested} requested, but only {available} available")]
    OutOfStock { sku: Sku, available: i64, requested: i64 },
    #[error("There is no reservation for order {0}")]
    ReservationNotFound(OrderId),
    #[error("The reservation for order {order_id} is already {status}")]
    Conflict { order_id: OrderId, status: ReservationStatus },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The reservation ledger owns the lifecycle of holds and is the only place where `reserved` and `stock` change in
/// response to orders.
///
/// Every mutating method runs as a single write-exclusive transaction. Methods that place or commit a hold first sweep
/// expired holds inside that same transaction, so capacity checks never see units held by stale reservations.
#[allow(async_fn_in_trait)]
pub trait ReservationLedger {
    /// Places a hold for every item in the request, or for none of them.
    ///
    /// * Unknown SKUs fail with [`LedgerError::SkuNotFound`] before anything is changed.
    /// * If any item asks for more than is available, the call fails with [`LedgerError::OutOfStock`], naming the
    ///   first offending SKU and its true availability.
    /// * A second hold for the same order id fails with [`LedgerError::OrderAlreadyExists`].
    async fn create_hold(&self, request: HoldRequest) -> Result<HoldPlaced, LedgerError>;

    /// Converts an active hold into a sale: `stock` and `reserved` both drop by the held quantity and the reservation
    /// becomes `paid`.
    ///
    /// Committing an already paid reservation is a no-op that reports [`crate::traits::CommitOutcome::AlreadyPaid`].
    /// Committing a released or expired reservation fails with [`LedgerError::Conflict`] and changes nothing.
    async fn commit_paid(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<CommitResult, LedgerError>;

    /// Returns the held units of an active reservation to the pool and marks it with the given terminal status.
    /// Releasing anything other than an active reservation is a no-op.
    async fn release(&self, order_id: &OrderId, status: ReservationStatus) -> Result<ReleaseOutcome, LedgerError>;

    /// Sweeps every active reservation whose expiry time is at or before `now` to `expired`, returning its units to
    /// the pool. Returns the holds that were swept.
    async fn expire_holds(&self, now: DateTime<Utc>) -> Result<Vec<Hold>, LedgerError>;

    async fn fetch_hold(&self, order_id: &OrderId) -> Result<Option<Hold>, LedgerError>;
}
