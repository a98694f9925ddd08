use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus},
    traits::LedgerError,
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order. Fails with [`LedgerError::OrderAlreadyExists`] if the order id is taken.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError>;

    /// Overwrites the order status and bumps `updated_at`.
    /// Fails with [`LedgerError::OrderNotFound`] if there is no such order.
    async fn update_order_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<Order, LedgerError>;
}
