use chrono::{DateTime, Utc};
use mockall::mock;
use storefront_engine::{
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
        PaymentLinkError,
        PaymentLinkProvider,
        PaymentLinkRequest,
        ReleaseOutcome,
        ReservationLedger,
        StorefrontDatabase,
    },
};

mock! {
    pub StorefrontDb {}
    impl InventoryManagement for StorefrontDb {
        async fn fetch_item(&self, sku: &Sku) -> Result<Option<InventoryItem>, LedgerError>;
        async fn list_inventory(&self) -> Result<Vec<InventoryItem>, LedgerError>;
        async fn set_stock(&self, updates: &[StockUpdate]) -> Result<Vec<InventoryItem>, LedgerError>;
        async fn upsert_item(&self, item: NewInventoryItem) -> Result<InventoryItem, LedgerError>;
    }
    impl ReservationLedger for StorefrontDb {
        async fn create_hold(&self, request: HoldRequest) -> Result<HoldPlaced, LedgerError>;
        async fn commit_paid(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<CommitResult, LedgerError>;
        async fn release(&self, order_id: &OrderId, status: ReservationStatus) -> Result<ReleaseOutcome, LedgerError>;
        async fn expire_holds(&self, now: DateTime<Utc>) -> Result<Vec<Hold>, LedgerError>;
        async fn fetch_hold(&self, order_id: &OrderId) -> Result<Option<Hold>, LedgerError>;
    }
    impl OrderManagement for StorefrontDb {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError>;
        async fn update_order_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<Order, LedgerError>;
    }
    impl StorefrontDatabase for StorefrontDb {
        fn url(&self) -> &str;
    }
}

mock! {
    pub LinkProvider {}
    impl PaymentLinkProvider for LinkProvider {
        async fn create_link(&self, request: &PaymentLinkRequest) -> Result<String, PaymentLinkError>;
    }
}
