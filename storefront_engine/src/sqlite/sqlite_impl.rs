//! `SqliteDatabase` is the concrete storefront backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every ledger mutation runs in its own [`ImmediateTransaction`].
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, inventory, new_pool, orders, reservations, ImmediateTransaction};
use crate::{
    db_types::{
        Hold,
        InventoryItem,
        NewInventoryItem,
        NewOrder,
        Order,
        OrderId,
        OrderStatus,
        ReservationStatus,
        Sku,
        StockUpdate,
    },
    traits::{
        CommitResult,
        HoldPlaced,
        HoldRequest,
        InventoryManagement,
        LedgerError,
        OrderManagement,
        ReleaseOutcome,
        ReservationLedger,
        StorefrontDatabase,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_item(&self, sku: &Sku) -> Result<Option<InventoryItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let item = inventory::fetch_item(sku, &mut conn).await?;
        Ok(item)
    }

    async fn list_inventory(&self) -> Result<Vec<InventoryItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let items = inventory::fetch_all(&mut conn).await?;
        Ok(items)
    }

    async fn set_stock(&self, updates: &[StockUpdate]) -> Result<Vec<InventoryItem>, LedgerError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = inventory::set_stock(updates, &mut tx).await;
        tx.finish(result).await
    }

    async fn upsert_item(&self, item: NewInventoryItem) -> Result<InventoryItem, LedgerError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = inventory::upsert(item, &mut tx).await;
        tx.finish(result).await
    }
}

impl ReservationLedger for SqliteDatabase {
    async fn create_hold(&self, request: HoldRequest) -> Result<HoldPlaced, LedgerError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = reservations::create_hold(request, &mut tx).await;
        tx.finish(result).await
    }

    async fn commit_paid(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<CommitResult, LedgerError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = reservations::commit_paid(order_id, now, &mut tx).await;
        tx.finish(result).await
    }

    async fn release(&self, order_id: &OrderId, status: ReservationStatus) -> Result<ReleaseOutcome, LedgerError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = reservations::release(order_id, status, &mut tx).await;
        tx.finish(result).await
    }

    async fn expire_holds(&self, now: DateTime<Utc>) -> Result<Vec<Hold>, LedgerError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = reservations::expire_holds(now, &mut tx).await;
        tx.finish(result).await
    }

    async fn fetch_hold(&self, order_id: &OrderId) -> Result<Option<Hold>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let hold = reservations::fetch_hold(order_id, &mut conn).await?;
        Ok(hold)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = orders::insert_order(order, &mut tx).await;
        tx.finish(result).await
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn update_order_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<Order, LedgerError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = orders::update_order_status(order_id, &status, &mut tx).await;
        tx.finish(result).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in the `SFS_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
