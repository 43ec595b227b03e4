//! Persistence for the status page backend.
//!
//! Two layers live here:
//!
//! - [`repositories`]: zero-sized `*Repo` structs issuing runtime `sqlx`
//!   queries against Postgres, one per table family.
//! - [`store`]: the capability traits the services depend on
//!   ([`CredentialStore`], [`EventStore`], [`SubscriberStore`]), implemented by
//!   [`PgStore`] on top of the repositories and by [`MemoryStore`] for tests.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use store::{CredentialStore, EventStore, PgStore, StoreError, StoreHealth, SubscriberStore};

pub type DbPool = sqlx::PgPool;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply any pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
