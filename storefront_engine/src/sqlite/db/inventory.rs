use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InventoryItem, NewInventoryItem, Sku, StockUpdate},
    traits::LedgerError,
};

pub async fn fetch_item(sku: &Sku, conn: &mut SqliteConnection) -> Result<Option<InventoryItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM inventory WHERE sku = $1").bind(sku.as_str()).fetch_optional(conn).await?;
    Ok(item)
}

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<InventoryItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM inventory ORDER BY name, sku").fetch_all(conn).await?;
    Ok(items)
}

/// Moves `reserved` by `delta`, which may be negative. The result is clamped so that `reserved` never drops below zero.
///
/// No capacity check happens here. Callers that increase `reserved` must have checked availability in the same
/// transaction.
pub async fn adjust_reserved(sku: &Sku, delta: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE inventory SET reserved = MAX(reserved + $1, 0) WHERE sku = $2")
        .bind(delta)
        .bind(sku.as_str())
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::SkuNotFound(sku.clone()));
    }
    trace!("🗃️ Reserved units of {sku} adjusted by {delta}");
    Ok(())
}

/// Consumes `qty` units: both `stock` and `reserved` drop by `qty`, each floored at zero.
pub async fn adjust_stock_and_reserved(sku: &Sku, qty: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query(
        r#"
        UPDATE inventory SET
            stock = MAX(stock - $1, 0),
            reserved = MAX(reserved - $1, 0)
        WHERE sku = $2
        "#,
    )
    .bind(qty)
    .bind(sku.as_str())
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::SkuNotFound(sku.clone()));
    }
    trace!("🗃️ {qty} units of {sku} consumed");
    Ok(())
}

/// Applies every update, or fails on the first unknown SKU or on a stock level below what is currently reserved.
/// Run this inside a transaction so that a failure leaves no partial changes behind.
pub async fn set_stock(
    updates: &[StockUpdate],
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryItem>, LedgerError> {
    let mut result = Vec::with_capacity(updates.len());
    for update in updates {
        if update.stock < 0 {
            return Err(LedgerError::InvalidRequest(format!("Stock for {} cannot be negative", update.sku)));
        }
        let item = fetch_item(&update.sku, conn).await?.ok_or_else(|| LedgerError::SkuNotFound(update.sku.clone()))?;
        if update.stock < item.reserved {
            return Err(LedgerError::InvalidRequest(format!(
                "Cannot set stock for {} to {}, since {} units are currently reserved",
                update.sku, update.stock, item.reserved
            )));
        }
        let item: InventoryItem = sqlx::query_as("UPDATE inventory SET stock = $1 WHERE sku = $2 RETURNING *")
            .bind(update.stock)
            .bind(update.sku.as_str())
            .fetch_one(&mut *conn)
            .await?;
        debug!("🗃️ Stock for {} set to {}", item.sku, item.stock);
        result.push(item);
    }
    Ok(result)
}

pub async fn upsert(item: NewInventoryItem, conn: &mut SqliteConnection) -> Result<InventoryItem, LedgerError> {
    if item.stock < 0 || item.unit_price.is_negative() {
        return Err(LedgerError::InvalidRequest(format!("Stock and price for {} cannot be negative", item.sku)));
    }
    if let Some(existing) = fetch_item(&item.sku, conn).await? {
        if item.stock < existing.reserved {
            return Err(LedgerError::InvalidRequest(format!(
                "Cannot set stock for {} to {}, since {} units are currently reserved",
                item.sku, item.stock, existing.reserved
            )));
        }
    }
    let item = sqlx::query_as(
        r#"
        INSERT INTO inventory (sku, name, stock, unit_price) VALUES ($1, $2, $3, $4)
        ON CONFLICT (sku) DO UPDATE SET
            name = excluded.name,
            stock = excluded.stock,
            unit_price = excluded.unit_price
        RETURNING *;
        "#,
    )
    .bind(item.sku.as_str())
    .bind(item.name)
    .bind(item.stock)
    .bind(item.unit_price)
    .fetch_one(conn)
    .await?;
    Ok(item)
}
