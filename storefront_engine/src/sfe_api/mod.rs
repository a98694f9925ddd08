//! The public face of the storefront engine.
//!
//! [`FulfilmentApi`](fulfilment_api::FulfilmentApi) drives the order lifecycle: placing holds, pricing orders,
//! requesting payment pages and acting on verified payment notifications.
//! [`InventoryApi`](inventory_api::InventoryApi) lists and administers stock.
//!
//! Both are generic over their backend. Anything implementing the traits in [`crate::traits`] can act as one.
pub mod errors;
pub mod fulfilment_api;
pub mod inventory_api;
pub mod order_objects;
pub mod payment_objects;
