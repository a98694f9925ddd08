use thiserror::Error;

use crate::{
    db_types::{OrderId, ReservationStatus, Sku},
    traits::{LedgerError, PaymentLinkError},
};

/// Failures of the order flow, grouped the way callers need to react to them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfilmentError {
    /// The request was malformed. Nothing was changed.
    #[error("Invalid request. {0}")]
    Validation(String),
    #[error("Unknown SKU: {0}")]
    UnknownSku(Sku),
    /// Not enough stock was available. No hold was placed.
    #[error("Not enough stock for {sku}. {requested} requested, but only {available} available")]
    Capacity { sku: Sku, available: i64, requested: i64 },
    /// A terminal reservation was asked to do something it can no longer do, e.g. a payment confirmation arrived for a
    /// hold that has already expired. These need manual reconciliation.
    #[error("The reservation for order {order_id} is already {status}")]
    Conflict { order_id: OrderId, status: ReservationStatus },
    #[error("{0}")]
    NotFound(String),
    #[error("Could not create a payment link. {0}")]
    PaymentLink(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

impl FulfilmentError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownSku(_))
    }
}

impl From<LedgerError> for FulfilmentError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::SkuNotFound(sku) => Self::UnknownSku(sku),
            LedgerError::OutOfStock { sku, available, requested } => Self::Capacity { sku, available, requested },
            LedgerError::ReservationNotFound(order_id) => {
                Self::NotFound(format!("There is no reservation for order {order_id}"))
            },
            LedgerError::Conflict { order_id, status } => Self::Conflict { order_id, status },
            LedgerError::OrderNotFound(order_id) => Self::NotFound(format!("Order {order_id} does not exist")),
            LedgerError::OrderAlreadyExists(order_id) => Self::Validation(format!("Order {order_id} already exists")),
            LedgerError::InvalidRequest(s) => Self::Validation(s),
            LedgerError::DatabaseError(s) => Self::Backend(s),
        }
    }
}

impl From<PaymentLinkError> for FulfilmentError {
    fn from(e: PaymentLinkError) -> Self {
        Self::PaymentLink(e.to_string())
    }
}
