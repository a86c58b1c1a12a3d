//! Persistence gateway for rooms, participants, rounds, and votes.
//!
//! Backed by SQLite through sqlx. Repositories are zero-sized structs with
//! async methods taking `&DbPool`; multi-table operations run inside a
//! transaction so each gateway call is atomic with respect to other calls
//! on the same room.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod ids;
pub mod models;
pub mod repositories;

pub type DbPool = sqlx::SqlitePool;

/// Create a connection pool from a database URL (e.g. `sqlite://poker.db`).
///
/// The database file is created if missing and foreign keys are enforced
/// on every connection — cascade deletes depend on it.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(20)
        .connect_with(options)
        .await
}

/// Run the embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
