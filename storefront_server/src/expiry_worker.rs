use std::time::Duration;

use log::*;
use storefront_engine::{db_types::Hold, FulfilmentApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Holds are also swept lazily before every hold, commit and inventory listing, so the worker only matters for
/// releasing stale holds while the shop is quiet.
pub fn start_expiry_worker(api: FulfilmentApi<SqliteDatabase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Hold expiry worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running hold expiry job");
            match api.expire_holds().await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No stale holds"),
                Ok(expired) => {
                    info!("🕰️ {} holds expired", expired.len());
                    debug!("🕰️ Expired holds: {}", hold_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running hold expiry job: {e}");
                },
            }
        }
    })
}

fn hold_list(holds: &[Hold]) -> String {
    holds
        .iter()
        .map(|h| {
            let units = h.items.iter().map(|i| i.qty).sum::<i64>();
            format!("[{}] order_id: {} units: {units}", h.reservation.id, h.reservation.order_id)
        })
        .collect::<Vec<String>>()
        .join(", ")
}
