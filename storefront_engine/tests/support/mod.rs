#![allow(dead_code)]
use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use storefront_engine::{
    db_types::{InventoryItem, NewInventoryItem, Price, Sku},
    events::EventProducers,
    helpers::ManualClock,
    order_objects::{Customer, Delivery, OrderLine, OrderRequest},
    sqlite::db::reservations,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{PaymentLinkError, PaymentLinkProvider, PaymentLinkRequest},
    FulfilmentApi,
    InventoryManagement,
    SqliteDatabase,
    StorefrontDatabase,
};

pub async fn setup(stock: &[(&str, i64)]) -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    for (sku, qty) in stock {
        let item = NewInventoryItem {
            sku: Sku::from(*sku),
            name: format!("Item {sku}"),
            stock: *qty,
            unit_price: Price::from(100),
        };
        db.upsert_item(item).await.expect("Error seeding inventory");
    }
    db
}

pub async fn tear_down(db: SqliteDatabase) {
    db.pool().close().await;
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        error!("🚀️ Failed to drop database: {e}");
    }
}

pub fn fulfilment_api(
    db: SqliteDatabase,
    producers: EventProducers,
    clock: &ManualClock,
) -> FulfilmentApi<SqliteDatabase> {
    FulfilmentApi::new(db, producers).with_clock(clock.clone())
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z").expect("valid timestamp").with_timezone(&Utc)
}

pub async fn item(db: &SqliteDatabase, sku: &str) -> InventoryItem {
    db.fetch_item(&Sku::from(sku)).await.expect("Error fetching item").expect("Item does not exist")
}

pub async fn held_units(db: &SqliteDatabase, sku: &str) -> i64 {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    reservations::held_units(&Sku::from(sku), &mut conn).await.expect("Error summing held units")
}

pub fn order_request(lines: &[(&str, i64)]) -> OrderRequest {
    OrderRequest {
        init_data: "query_id=1".into(),
        telegram_id: Some(42),
        telegram_username: Some("ann".into()),
        customer: Customer { name: "Ann".into(), email: "ann@example.com".into(), phone: "+100".into() },
        delivery: Delivery { method: "cdek".into(), pickup_point: "Main St 1".into() },
        comment: Some("Ring twice".into()),
        items: lines.iter().map(|(sku, qty)| OrderLine { sku: Sku::from(*sku), qty: *qty }).collect(),
    }
}

/// A payment provider that hands out the same page for every order.
pub struct FixedLink;

impl PaymentLinkProvider for FixedLink {
    async fn create_link(&self, request: &PaymentLinkRequest) -> Result<String, PaymentLinkError> {
        Ok(format!("https://pay.example/{}", request.order_id))
    }
}

/// A payment provider that is always down.
pub struct BrokenLink;

impl PaymentLinkProvider for BrokenLink {
    async fn create_link(&self, _request: &PaymentLinkRequest) -> Result<String, PaymentLinkError> {
        Err(PaymentLinkError("provider unavailable".into()))
    }
}
