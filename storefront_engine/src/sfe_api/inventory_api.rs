use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db_types::{InventoryItem, InventoryLevel, NewInventoryItem, Sku, StockUpdate},
    events::{EventProducers, HoldReleasedEvent},
    helpers::{Clock, SystemClock},
    sfe_api::errors::FulfilmentError,
    traits::{InventoryManagement, ReservationLedger},
};

/// Read and administer stock levels.
///
/// Listing inventory reclaims stale holds first, so the `available` figure shoppers see never counts units held by
/// reservations that have already timed out.
pub struct InventoryApi<B> {
    db: B,
    producers: EventProducers,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement + ReservationLedger
{
    pub async fn list_inventory(&self) -> Result<Vec<InventoryLevel>, FulfilmentError> {
        let expired = self.db.expire_holds(self.clock.now()).await?;
        for hold in expired {
            self.producers.publish_hold_released(HoldReleasedEvent::new(hold)).await;
        }
        let items = self.db.list_inventory().await?;
        trace!("📦️ Listing {} inventory items", items.len());
        Ok(items.into_iter().map(InventoryLevel::from).collect())
    }

    pub async fn fetch_item(&self, sku: &Sku) -> Result<Option<InventoryLevel>, FulfilmentError> {
        Ok(self.db.fetch_item(sku).await?.map(InventoryLevel::from))
    }

    /// Sets the physical stock for a batch of SKUs. The batch is applied atomically: if any update is rejected, none
    /// are applied.
    pub async fn set_stock(&self, updates: &[StockUpdate]) -> Result<Vec<InventoryLevel>, FulfilmentError> {
        if updates.is_empty() {
            return Err(FulfilmentError::Validation("No stock updates were given".into()));
        }
        let items = self.db.set_stock(updates).await?;
        info!("📦️ Stock updated for {} items", items.len());
        Ok(items.into_iter().map(InventoryLevel::from).collect())
    }

    pub async fn upsert_item(&self, item: NewInventoryItem) -> Result<InventoryItem, FulfilmentError> {
        let sku = item.sku.clone();
        let item = self.db.upsert_item(item).await?;
        info!("📦️ Catalogue entry for {sku} saved. Stock: {}, reserved: {}", item.stock, item.reserved);
        Ok(item)
    }
}
