//! Reservation ledger queries.
//!
//! The composite operations here ([`create_hold`], [`commit_paid`], [`release`] and [`expire_holds`]) are not atomic
//! on their own. The backend runs each of them inside an [`super::ImmediateTransaction`].
use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use super::inventory;
use crate::{
    db_types::{Hold, HoldItem, OrderId, Reservation, ReservationItem, ReservationStatus, Sku},
    traits::{CommitOutcome, CommitResult, HoldPlaced, HoldRequest, LedgerError, ReleaseOutcome},
};

pub async fn fetch_reservation(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Reservation>, sqlx::Error> {
    let reservation = sqlx::query_as("SELECT * FROM reservations WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(reservation)
}

pub async fn fetch_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<ReservationItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM reservation_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_hold(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Hold>, sqlx::Error> {
    let Some(reservation) = fetch_reservation(order_id, conn).await? else {
        return Ok(None);
    };
    let items = fetch_items(order_id, conn).await?;
    Ok(Some(Hold { reservation, items }))
}

async fn set_status(
    order_id: &OrderId,
    status: &ReservationStatus,
    conn: &mut SqliteConnection,
) -> Result<Reservation, sqlx::Error> {
    let reservation = sqlx::query_as("UPDATE reservations SET status = $1 WHERE order_id = $2 RETURNING *")
        .bind(status.as_str())
        .bind(order_id.as_str())
        .fetch_one(conn)
        .await?;
    Ok(reservation)
}

/// Merges repeated SKUs into a single line, keeping the order in which SKUs first appear.
fn merge_items(items: &[HoldItem]) -> Result<Vec<HoldItem>, LedgerError> {
    let mut merged: Vec<HoldItem> = Vec::with_capacity(items.len());
    for item in items {
        match merged.iter_mut().find(|m| m.sku == item.sku) {
            Some(existing) => {
                existing.qty = existing.qty.checked_add(item.qty).ok_or_else(|| {
                    LedgerError::InvalidRequest(format!("The total quantity for {} is too large", item.sku))
                })?;
            },
            None => merged.push(item.clone()),
        }
    }
    Ok(merged)
}

/// Places a hold for every item, or for none. Expired holds are swept first so that their units count as available.
pub async fn create_hold(request: HoldRequest, conn: &mut SqliteConnection) -> Result<HoldPlaced, LedgerError> {
    if request.items.is_empty() {
        return Err(LedgerError::InvalidRequest("A hold needs at least one item".into()));
    }
    if let Some(item) = request.items.iter().find(|i| i.qty <= 0) {
        return Err(LedgerError::InvalidRequest(format!("Quantity for {} must be positive", item.sku)));
    }
    let expired = expire_holds(request.created_at, conn).await?;
    if fetch_reservation(&request.order_id, conn).await?.is_some() {
        return Err(LedgerError::OrderAlreadyExists(request.order_id));
    }
    let items = merge_items(&request.items)?;
    // Resolve every SKU before checking capacity, so an unknown SKU is reported as such
    let mut stock = Vec::with_capacity(items.len());
    for item in &items {
        let inv = inventory::fetch_item(&item.sku, conn).await?;
        stock.push(inv.ok_or_else(|| LedgerError::SkuNotFound(item.sku.clone()))?);
    }
    for (item, inv) in items.iter().zip(&stock) {
        let available = inv.available();
        if item.qty > available {
            debug!(
                "📦️ Hold for order {} rejected. {} x {} requested, {available} available",
                request.order_id, item.qty, item.sku
            );
            return Err(LedgerError::OutOfStock { sku: item.sku.clone(), available, requested: item.qty });
        }
    }
    for item in &items {
        inventory::adjust_reserved(&item.sku, item.qty, conn).await?;
    }
    let reservation: Reservation = sqlx::query_as(
        r#"
        INSERT INTO reservations (order_id, status, expires_at, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *;
        "#,
    )
    .bind(request.order_id.as_str())
    .bind(ReservationStatus::Active.as_str())
    .bind(request.expires_at)
    .bind(request.created_at)
    .fetch_one(&mut *conn)
    .await?;
    let mut held = Vec::with_capacity(items.len());
    for item in &items {
        let row: ReservationItem =
            sqlx::query_as("INSERT INTO reservation_items (order_id, sku, qty) VALUES ($1, $2, $3) RETURNING *")
                .bind(request.order_id.as_str())
                .bind(item.sku.as_str())
                .bind(item.qty)
                .fetch_one(&mut *conn)
                .await?;
        held.push(row);
    }
    debug!(
        "📦️ Hold placed for order {} ({} line(s), expires {})",
        reservation.order_id,
        held.len(),
        reservation.expires_at
    );
    Ok(HoldPlaced { hold: Hold { reservation, items: held }, expired })
}

/// Returns the held units of every line to the pool and marks the reservation with `status`.
/// The caller must have checked that the reservation is active.
async fn restore_and_mark(
    hold: Hold,
    status: ReservationStatus,
    conn: &mut SqliteConnection,
) -> Result<Hold, LedgerError> {
    for item in &hold.items {
        inventory::adjust_reserved(&item.sku, -item.qty, conn).await?;
    }
    let reservation = set_status(&hold.reservation.order_id, &status, conn).await?;
    Ok(Hold { reservation, items: hold.items })
}

pub async fn commit_paid(
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<CommitResult, LedgerError> {
    let expired = expire_holds(now, conn).await?;
    let hold = fetch_hold(order_id, conn).await?;
    let hold = hold.ok_or_else(|| LedgerError::ReservationNotFound(order_id.clone()))?;
    match &hold.reservation.status {
        ReservationStatus::Paid => {
            debug!("📦️ Reservation for order {order_id} is already paid. Nothing to do.");
            Ok(CommitResult { outcome: CommitOutcome::AlreadyPaid, hold, expired })
        },
        ReservationStatus::Active => {
            for item in &hold.items {
                inventory::adjust_stock_and_reserved(&item.sku, item.qty, conn).await?;
            }
            let reservation = set_status(order_id, &ReservationStatus::Paid, conn).await?;
            debug!("📦️ Reservation for order {order_id} committed. {} line(s) deducted", hold.items.len());
            let hold = Hold { reservation, items: hold.items };
            Ok(CommitResult { outcome: CommitOutcome::Committed, hold, expired })
        },
        status => Err(LedgerError::Conflict { order_id: order_id.clone(), status: status.clone() }),
    }
}

pub async fn release(
    order_id: &OrderId,
    status: ReservationStatus,
    conn: &mut SqliteConnection,
) -> Result<ReleaseOutcome, LedgerError> {
    if !status.is_terminal() {
        return Err(LedgerError::InvalidRequest("A hold can only be released into a terminal status".into()));
    }
    let Some(hold) = fetch_hold(order_id, conn).await? else {
        debug!("📦️ No reservation for order {order_id}. Nothing to release.");
        return Ok(ReleaseOutcome::NotFound);
    };
    if hold.reservation.status != ReservationStatus::Active {
        debug!("📦️ Reservation for order {order_id} is already {}. Nothing to release.", hold.reservation.status);
        return Ok(ReleaseOutcome::NotActive(hold.reservation.status));
    }
    let hold = restore_and_mark(hold, status, conn).await?;
    debug!("📦️ Reservation for order {order_id} released as {}", hold.reservation.status);
    Ok(ReleaseOutcome::Released(hold))
}

/// Active reservations whose expiry time is at or before `now`.
pub async fn fetch_expired(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Reservation>, sqlx::Error> {
    let reservations = sqlx::query_as(
        r#"
        SELECT * FROM reservations
        WHERE status = 'active' AND julianday(expires_at) <= julianday($1)
        ORDER BY expires_at
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(reservations)
}

/// Sweeps stale holds to `expired`. The status guard makes this safe to repeat: a reservation that is no longer active
/// is never restored twice.
pub async fn expire_holds(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Hold>, LedgerError> {
    let stale = fetch_expired(now, conn).await?;
    let mut expired = Vec::with_capacity(stale.len());
    for reservation in stale {
        let items = fetch_items(&reservation.order_id, conn).await?;
        let hold = restore_and_mark(Hold { reservation, items }, ReservationStatus::Expired, conn).await?;
        info!("🕰️ Hold for order {} expired at {}", hold.reservation.order_id, hold.reservation.expires_at);
        expired.push(hold);
    }
    Ok(expired)
}

pub async fn held_units(sku: &Sku, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let total: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT SUM(ri.qty) FROM reservation_items ri
        JOIN reservations r ON r.order_id = ri.order_id
        WHERE r.status = 'active' AND ri.sku = $1
        "#,
    )
    .bind(sku.as_str())
    .fetch_one(conn)
    .await?;
    Ok(total.unwrap_or(0))
}
