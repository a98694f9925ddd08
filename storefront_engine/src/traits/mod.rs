//! # Backend contracts
//!
//! This module defines the behaviour a storage backend must provide to act as the storefront's ledger.
//!
//! * [`InventoryManagement`] covers reading the catalogue and the administrative stock changes.
//! * [`ReservationLedger`] owns holds: placing them, committing them when payment is confirmed, releasing them and
//!   sweeping expired ones. It is the only place where order flow changes `stock` or `reserved`.
//! * [`OrderManagement`] stores the order records that pair 1:1 with reservations.
//!
//! [`StorefrontDatabase`] bundles the three for backends that provide all of them.
//!
//! [`PaymentLinkProvider`] is the seam to the external payment page provider.
mod data_objects;
mod inventory_management;
mod order_management;
mod payment_links;
mod reservation_ledger;

pub use data_objects::{CommitOutcome, CommitResult, HoldPlaced, HoldRequest, ReleaseOutcome};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use payment_links::{PaymentLinkError, PaymentLinkProvider, PaymentLinkRequest};
pub use reservation_ledger::{LedgerError, ReservationLedger};

pub trait StorefrontDatabase: InventoryManagement + ReservationLedger + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;
}
