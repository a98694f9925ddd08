//! # Storefront server
//! This crate hosts the HTTP surface of the storefront. It is responsible for:
//! * Accepting purchase requests, placing holds on stock and handing out payment links.
//! * Verifying payment webhooks and committing or releasing the matching holds.
//! * Inventory listing and administration.
//! * Running the background hold expiry worker and forwarding paid orders to the CRM.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/orders`: Place an order. Returns the order id and a payment link.
//! * `GET /api/orders/{order_id}`: Fetch an order record.
//! * `POST /api/payments/webhook`: Signed payment notifications from the payment provider.
//! * `GET /api/inventory`: Current stock levels.
//! * `PATCH /api/inventory` and `POST /api/inventory`: Stock and catalogue administration (HTTP Basic auth).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
