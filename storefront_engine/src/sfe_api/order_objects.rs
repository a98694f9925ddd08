use serde::{Deserialize, Serialize};

use crate::db_types::{HoldItem, OrderId, Price, Sku};

/// Largest quantity accepted for a single order line.
pub const MAX_LINE_QTY: i64 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Carrier, e.g. `cdek`
    pub method: String,
    pub pickup_point: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: Sku,
    pub qty: i64,
}

/// A purchase request as submitted by the storefront. The whole request is stored with the order, since downstream
/// notifications need the customer and delivery details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Opaque launch data from the storefront's host app. Kept for the record, never interpreted.
    #[serde(default, rename = "initData")]
    pub init_data: String,
    #[serde(default)]
    pub telegram_id: Option<i64>,
    #[serde(default)]
    pub telegram_username: Option<String>,
    pub customer: Customer,
    pub delivery: Delivery,
    #[serde(default)]
    pub comment: Option<String>,
    pub items: Vec<OrderLine>,
}

impl OrderRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("An order needs at least one item".into());
        }
        for line in &self.items {
            if line.sku.as_str().is_empty() {
                return Err("Every order line needs a SKU".into());
            }
            if !(1..=MAX_LINE_QTY).contains(&line.qty) {
                return Err(format!("Quantity for {} must be between 1 and {MAX_LINE_QTY}", line.sku));
            }
        }
        Ok(())
    }

    pub fn hold_items(&self) -> Vec<HoldItem> {
        self.items.iter().map(|l| HoldItem { sku: l.sku.clone(), qty: l.qty }).collect()
    }

    /// Multi-line summary for the merchant, attached to the payment page.
    pub fn customer_extra(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\nPhone: {}\nDelivery: {}\nPickup point: {}\nComment: {}",
            self.customer.name,
            self.customer.email,
            self.customer.phone,
            self.delivery.method,
            self.delivery.pickup_point,
            self.comment.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

/// An order line with its catalogue details resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub sku: Sku,
    pub name: String,
    pub unit_price: Price,
    pub qty: i64,
}

impl PricedLine {
    pub fn total(&self) -> Price {
        self.unit_price * self.qty
    }
}

/// The response to a successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub payment_url: String,
    pub amount: Price,
}
