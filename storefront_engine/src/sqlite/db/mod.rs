//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or open an
//! [`ImmediateTransaction`] as the need arises and call through to the functions without any other changes.
use std::{
    env,
    ops::{Deref, DerefMut},
    str::FromStr,
    time::Duration,
};

use log::*;
use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    Sqlite,
    SqliteConnection,
    SqlitePool,
};

pub mod inventory;
pub mod orders;
pub mod reservations;

const SQLITE_DB_URL: &str = "sqlite://data/storefront.db";

/// How long a writer waits for the database lock before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

pub fn db_url() -> String {
    let result = env::var("SFS_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ SFS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// A write-exclusive transaction on a pooled connection.
///
/// `BEGIN IMMEDIATE` takes SQLite's write lock up front, so two ledger operations can never both read the same
/// `reserved` value and then both write. A competing writer blocks (up to [`BUSY_TIMEOUT`]) until the first one
/// commits or rolls back.
///
/// If the transaction is dropped without being finished (e.g. the request future was cancelled), the underlying
/// connection is detached from the pool and closed, which makes SQLite roll the transaction back and release the lock.
pub struct ImmediateTransaction {
    // Only ever `None` inside `drop`
    conn: Option<PoolConnection<Sqlite>>,
    open: bool,
}

impl ImmediateTransaction {
    pub async fn begin(pool: &SqlitePool) -> Result<Self, SqlxError> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn), open: true })
    }

    pub async fn commit(mut self) -> Result<(), SqlxError> {
        sqlx::query("COMMIT").execute(&mut *self).await?;
        self.open = false;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), SqlxError> {
        sqlx::query("ROLLBACK").execute(&mut *self).await?;
        self.open = false;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Commits if `result` is `Ok`, rolls back otherwise, and hands `result` back. A failed commit replaces the result
    /// with the commit error.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where E: From<SqlxError> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            },
            Err(e) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!("🗃️ Could not roll back transaction. The connection will be discarded. {rollback_err}");
                }
                Err(e)
            },
        }
    }
}

impl Deref for ImmediateTransaction {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_deref().expect("connection is held until the transaction is dropped")
    }
}

impl DerefMut for ImmediateTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_deref_mut().expect("connection is held until the transaction is dropped")
    }
}

impl Drop for ImmediateTransaction {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        warn!("🗃️ Transaction dropped while still open. Discarding its connection.");
        if let Some(conn) = self.conn.take() {
            // Closing the raw connection rolls back the open transaction
            drop(conn.detach());
        }
    }
}
