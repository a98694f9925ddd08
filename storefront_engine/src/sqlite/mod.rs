//! SQLite backend for the storefront ledger.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
