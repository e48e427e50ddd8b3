//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bamazon-cli migrate
//! ```
//!
//! Applies `crates/shop/migrations/` and creates the session store table.
//!
//! # Environment Variables
//!
//! - `SHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use thiserror::Error;

use bamazon_shop::config::{ConfigError, ShopConfig};
use bamazon_shop::db;
use bamazon_shop::middleware::create_migrated_session_store;
use bamazon_shop::middleware::session::SessionSetupError;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store error: {0}")]
    Sessions(#[from] SessionSetupError),
}

/// Run the shop migrations, then the session store migration.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let config = ShopConfig::from_env()?;

    tracing::info!("Connecting to shop database...");
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Running shop migrations...");
    sqlx::migrate!("../shop/migrations").run(&pool).await?;

    tracing::info!("Creating session store table...");
    create_migrated_session_store(&pool).await?;

    tracing::info!("Shop migrations complete!");
    Ok(())
}
