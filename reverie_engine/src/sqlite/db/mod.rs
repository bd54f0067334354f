//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Resource vectors are stored sparsely, one row per non-zero category. Rows that reach zero are deleted.
use std::env;

use log::*;
use reverie_common::{Category, ResourceVector};
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod inventory;
pub mod notifications;
pub mod offers;
pub mod posts;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/reverie.db";

pub fn db_url() -> String {
    let result = env::var("REVERIE_DATABASE_URL").unwrap_or_else(|_| {
        info!("REVERIE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Rebuilds a resource vector from `(category, amount)` rows. Rows naming an unknown category are skipped and logged,
/// since they can only come from outside the engine.
pub(crate) fn vector_from_rows(rows: Vec<(String, i64)>, context: &str) -> ResourceVector {
    rows.into_iter()
        .filter_map(|(name, amount)| match name.parse::<Category>() {
            Ok(category) => Some((category, amount)),
            Err(e) => {
                error!("📝️ Skipping stored row for {context}. {e}");
                None
            },
        })
        .collect()
}
