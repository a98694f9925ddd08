use crate::{
    db_types::{InventoryItem, NewInventoryItem, Sku, StockUpdate},
    traits::LedgerError,
};

/// Read and administrative access to the inventory table.
///
/// Capacity changes caused by holds are *not* made through this trait. They only ever happen inside the
/// [`crate::traits::ReservationLedger`] transactions.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn fetch_item(&self, sku: &Sku) -> Result<Option<InventoryItem>, LedgerError>;

    /// All inventory items, ordered by name.
    async fn list_inventory(&self) -> Result<Vec<InventoryItem>, LedgerError>;

    /// Sets the physical stock of each listed SKU in a single exclusive transaction.
    ///
    /// Unknown SKUs fail the whole batch with [`LedgerError::SkuNotFound`]. A stock level below the units currently
    /// reserved fails with [`LedgerError::InvalidRequest`]. Either way, nothing is applied.
    async fn set_stock(&self, updates: &[StockUpdate]) -> Result<Vec<InventoryItem>, LedgerError>;

    /// Creates a catalogue item, or updates the name, price and stock of an existing one. `reserved` is never touched.
    async fn upsert_item(&self, item: NewInventoryItem) -> Result<InventoryItem, LedgerError>;
}
