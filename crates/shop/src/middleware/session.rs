//! Session middleware configuration.
//!
//! Sessions are stored by tower-sessions in the `sessions` table of the shop
//! database. The cookie only carries the opaque session ID.

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ShopConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bamazon.sid";

/// Table the session store writes to.
pub const SESSIONS_TABLE: &str = "sessions";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Errors setting up the session store.
#[derive(Debug, Error)]
pub enum SessionSetupError {
    #[error("invalid session table name: {0}")]
    InvalidTableName(String),
    #[error("session store migration failed: {0}")]
    Migrate(#[from] sqlx::Error),
}

/// Create the `PostgreSQL` session store.
///
/// # Errors
///
/// Returns `SessionSetupError::InvalidTableName` if the store rejects the table name.
pub fn create_session_store(pool: &PgPool) -> Result<PostgresStore, SessionSetupError> {
    PostgresStore::new(pool.clone())
        .with_table_name(SESSIONS_TABLE)
        .map_err(SessionSetupError::InvalidTableName)
}

/// Create the session store and make sure its schema exists.
///
/// # Errors
///
/// Returns `SessionSetupError` if the store cannot be created or migrated.
pub async fn create_migrated_session_store(
    pool: &PgPool,
) -> Result<PostgresStore, SessionSetupError> {
    let store = create_session_store(pool)?;
    store.migrate().await?;
    Ok(store)
}

/// Create the session layer over any store.
///
/// Sessions are only persisted once something is written to them, which the
/// CSRF stage does on a visitor's first request.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &ShopConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
