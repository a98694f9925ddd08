use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
pub use storefront_common::Price;
use thiserror::Error;
use uuid::Uuid;

//--------------------------------------          Sku          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Sku(pub String);

impl Sku {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Sku {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl From<&str> for Sku {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<String> for Sku {
    fn from(s: String) -> Self {
        Self(s.trim().to_string())
    }
}

impl Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The correlation key shared by a reservation and its order. It is generated by us when the order is placed and is
/// echoed back by the payment provider in the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     InventoryItem     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InventoryItem {
    pub sku: Sku,
    pub name: String,
    /// Physical units owned
    pub stock: i64,
    /// Units provisionally held by active reservations
    pub reserved: i64,
    pub unit_price: Price,
}

impl InventoryItem {
    /// Units that may still be placed on hold.
    pub fn available(&self) -> i64 {
        self.stock - self.reserved
    }
}

/// An inventory row as presented to shoppers, with the derived availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub sku: Sku,
    pub name: String,
    pub stock: i64,
    pub reserved: i64,
    pub available: i64,
    pub unit_price: Price,
}

impl From<InventoryItem> for InventoryLevel {
    fn from(item: InventoryItem) -> Self {
        let available = item.available();
        Self {
            sku: item.sku,
            name: item.name,
            stock: item.stock,
            reserved: item.reserved,
            available,
            unit_price: item.unit_price,
        }
    }
}

/// Catalogue entry supplied by an administrator. `reserved` is never set through this path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub sku: Sku,
    pub name: String,
    pub stock: i64,
    #[serde(default)]
    pub unit_price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub sku: Sku,
    pub stock: i64,
}

//--------------------------------------   ReservationStatus   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ReservationStatus {
    /// Units are held against inventory. The only non-terminal state.
    Active,
    /// Payment was confirmed and the held units were deducted from stock.
    Paid,
    /// The hold lapsed before a payment confirmation arrived.
    Expired,
    /// The provider reported a non-success outcome. The reason is the status string it reported.
    Released(String),
}

pub const RELEASED_REASON: &str = "released";

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Builds the terminal status for a release. Reasons that would collide with the other lifecycle states are
    /// recorded as a plain `released`.
    pub fn released<S: AsRef<str>>(reason: S) -> Self {
        let reason = reason.as_ref().trim();
        match reason {
            "" | "active" | "paid" => Self::Released(RELEASED_REASON.to_string()),
            "expired" => Self::Expired,
            r => Self::Released(r.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Paid => "paid",
            Self::Expired => "expired",
            Self::Released(reason) => reason.as_str(),
        }
    }
}

impl Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ReservationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => Self::Active,
            "paid" => Self::Paid,
            "expired" => Self::Expired,
            _ => Self::Released(value),
        }
    }
}

impl From<ReservationStatus> for String {
    fn from(value: ReservationStatus) -> Self {
        value.as_str().to_string()
    }
}

//--------------------------------------      Reservation      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub order_id: OrderId,
    #[sqlx(try_from = "String")]
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ReservationItem {
    pub id: i64,
    pub order_id: OrderId,
    pub sku: Sku,
    pub qty: i64,
}

/// One requested line of a hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldItem {
    pub sku: Sku,
    pub qty: i64,
}

impl HoldItem {
    pub fn new<S: Into<Sku>>(sku: S, qty: i64) -> Self {
        Self { sku: sku.into(), qty }
    }
}

/// A reservation together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub reservation: Reservation,
    pub items: Vec<ReservationItem>,
}

//--------------------------------------      OrderStatus      ---------------------------------------------------------
/// Order status is free-form: besides our own `created` and `paid`, it records whatever status the payment provider
/// reported for a failed payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderStatus(pub String);

impl OrderStatus {
    pub const CREATED: &'static str = "created";
    pub const PAID: &'static str = "paid";
    pub const UNKNOWN: &'static str = "unknown";

    pub fn created() -> Self {
        Self(Self::CREATED.into())
    }

    pub fn paid() -> Self {
        Self(Self::PAID.into())
    }

    /// The status recorded for a non-success payment outcome.
    pub fn from_provider<S: AsRef<str>>(status: S) -> Self {
        let status = status.as_ref().trim();
        if status.is_empty() {
            Self(Self::UNKNOWN.into())
        } else {
            Self(status.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub amount: Price,
    /// Snapshot of the original purchase request, kept for downstream notifications.
    pub payload_json: String,
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error)]
#[error("The stored order payload is not valid JSON. {0}")]
pub struct PayloadDecodeError(String);

impl Order {
    pub fn payload(&self) -> Result<serde_json::Value, PayloadDecodeError> {
        serde_json::from_str(&self.payload_json).map_err(|e| PayloadDecodeError(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub amount: Price,
    pub payload: serde_json::Value,
    pub payment_url: Option<String>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, amount: Price, payload: serde_json::Value) -> Self {
        Self { order_id, amount, payload, payment_url: None }
    }

    pub fn with_payment_url<S: Into<String>>(mut self, url: S) -> Self {
        self.payment_url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn random_order_ids_are_uuids() {
        let id = OrderId::random();
        let parts = id.as_str().split('-').map(str::len).collect::<Vec<_>>();
        assert_eq!(parts, vec![8, 4, 4, 4, 12]);
        assert_eq!(&id.as_str()[14..15], "4");
        assert_ne!(id, OrderId::random());
    }

    #[test]
    fn reservation_status_round_trip() {
        for s in ["active", "paid", "expired", "fail", "released"] {
            assert_eq!(ReservationStatus::from(s.to_string()).as_str(), s);
        }
        assert_eq!(ReservationStatus::from("fail".to_string()), ReservationStatus::Released("fail".into()));
        assert!(!ReservationStatus::Active.is_terminal());
        assert!(ReservationStatus::Paid.is_terminal());
    }

    #[test]
    fn release_reasons_cannot_impersonate_other_states() {
        assert_eq!(ReservationStatus::released(""), ReservationStatus::Released("released".into()));
        assert_eq!(ReservationStatus::released("paid"), ReservationStatus::Released("released".into()));
        assert_eq!(ReservationStatus::released("active"), ReservationStatus::Released("released".into()));
        assert_eq!(ReservationStatus::released("expired"), ReservationStatus::Expired);
        assert_eq!(
            ReservationStatus::released(" order_canceled "),
            ReservationStatus::Released("order_canceled".into())
        );
    }

    #[test]
    fn provider_statuses() {
        assert_eq!(OrderStatus::from_provider("").as_str(), "unknown");
        assert_eq!(OrderStatus::from_provider("fail").as_str(), "fail");
    }

    #[test]
    fn availability_is_derived() {
        let item = InventoryItem {
            sku: "A".into(),
            name: "Alpha".into(),
            stock: 5,
            reserved: 3,
            unit_price: Price::from(100),
        };
        assert_eq!(item.available(), 2);
        assert_eq!(InventoryLevel::from(item).available, 2);
    }
}
