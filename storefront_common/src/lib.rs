//! Types shared by the storefront engine and server.
pub mod helpers;
pub mod op;
mod price;
mod secret;

pub use price::{Price, PriceConversionError};
pub use secret::Secret;
