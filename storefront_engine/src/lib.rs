//! Storefront Engine
//!
//! The storefront engine keeps a stock reservation ledger for a small online shop and reconciles it with the
//! notifications sent by a hosted payment provider.
//!
//! The library is divided into three main sections:
//! 1. The ledger backend ([`mod@sqlite`]). Units are held against inventory when an order is placed, and either
//!    committed (the stock is deducted) or released (the units return to the pool) once the payment outcome is known.
//!    Every mutation runs inside an exclusive SQLite transaction. You should never need to access the database
//!    directly. The exception is the data types used in the database, which are defined in [`mod@db_types`].
//! 2. The public API ([`mod@sfe_api`]). This drives the order lifecycle and inventory administration. Any backend
//!    implementing the traits in [`mod@traits`] can be plugged in.
//! 3. Webhook helpers ([`mod@helpers`]). The payment provider signs its webhooks over one of several canonical forms
//!    of the payload; [`helpers::SignatureReconciler`] accepts a signature if it matches any of them.
//!
//! The engine also emits events when an order is paid or a hold is released. A simple actor framework lets you hook
//! into these events, e.g. to notify a CRM, without the outcome of the hook affecting the order flow.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod sfe_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use sfe_api::{
    errors::FulfilmentError,
    fulfilment_api::FulfilmentApi,
    inventory_api::InventoryApi,
    order_objects,
    payment_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{InventoryManagement, OrderManagement, ReservationLedger, StorefrontDatabase};
