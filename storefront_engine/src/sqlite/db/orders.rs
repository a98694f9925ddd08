use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus},
    traits::LedgerError,
};

/// Inserts a new order with status `created`. This is not atomic. You can embed this call inside a transaction if you
/// need to, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    if fetch_order_by_order_id(&order.order_id, conn).await?.is_some() {
        return Err(LedgerError::OrderAlreadyExists(order.order_id));
    }
    let now = Utc::now();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                status,
                amount,
                payload_json,
                payment_url,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(OrderStatus::CREATED)
    .bind(order.amount)
    .bind(order.payload.to_string())
    .bind(order.payment_url)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🧾️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn update_order_status(
    order_id: &OrderId,
    status: &OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerError> {
    let order: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE order_id = $3 RETURNING *")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(order_id.as_str())
            .fetch_optional(conn)
            .await?;
    let order = order.ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
    debug!("🧾️ Order [{order_id}] status is now {}", order.status);
    Ok(order)
}
