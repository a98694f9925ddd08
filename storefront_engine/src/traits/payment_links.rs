use thiserror::Error;

use crate::{
    db_types::{OrderId, Price},
    sfe_api::order_objects::{Customer, PricedLine},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PaymentLinkError(pub String);

impl From<String> for PaymentLinkError {
    fn from(e: String) -> Self {
        Self(e)
    }
}

/// What the payment provider needs to know to build a checkout page for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkRequest {
    pub order_id: OrderId,
    pub customer: Customer,
    /// Free-text summary of the order for the merchant, one detail per line.
    pub customer_extra: String,
    pub products: Vec<PricedLine>,
    pub amount: Price,
}

/// Creates hosted payment pages. Implementations talk to the outside world, so they are always called outside of any
/// ledger transaction.
#[allow(async_fn_in_trait)]
pub trait PaymentLinkProvider {
    async fn create_link(&self, request: &PaymentLinkRequest) -> Result<String, PaymentLinkError>;
}
