use serde::{Deserialize, Serialize};

use crate::{
    db_types::OrderId,
    helpers::WebhookPayload,
    sfe_api::errors::FulfilmentError,
    traits::{CommitOutcome, ReleaseOutcome},
};

pub const PAYMENT_SUCCESS: &str = "success";

/// The parts of a verified payment webhook that drive the order flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub order_id: OrderId,
    /// The provider's payment status, lowercased. Empty if the webhook did not carry one.
    pub payment_status: String,
}

impl PaymentNotification {
    pub fn new<S: Into<String>>(order_id: OrderId, payment_status: S) -> Self {
        Self { order_id, payment_status: payment_status.into().trim().to_lowercase() }
    }

    /// Extracts the notification from a webhook payload.
    ///
    /// The provider uses `order_id` for its own identifier and echoes ours back as `order_num`, so `order_num` is
    /// preferred and `order_id` is only used when `order_num` is absent.
    pub fn from_payload(payload: &WebhookPayload) -> Result<Self, FulfilmentError> {
        let order_id = payload
            .field("order_num")
            .or_else(|| payload.field("order_id"))
            .map(|s| OrderId::from(s.trim()))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FulfilmentError::Validation("The webhook does not identify an order".into()))?;
        let status = payload.field("payment_status").unwrap_or_default();
        Ok(Self::new(order_id, status))
    }

    pub fn is_success(&self) -> bool {
        self.payment_status == PAYMENT_SUCCESS
    }
}

/// What handling a payment notification did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationOutcome {
    Paid(CommitOutcome),
    Released(ReleaseOutcome),
}
