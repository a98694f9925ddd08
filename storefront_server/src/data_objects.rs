use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_engine::db_types::{Order, OrderId, OrderStatus, Price, StockUpdate};

/// The order record as returned by `GET /api/orders/{order_id}`. The stored request payload is not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub amount: Price,
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            status: order.status,
            amount: order.amount,
            payment_url: order.payment_url,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdateRequest {
    pub items: Vec<StockUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub ok: bool,
}
