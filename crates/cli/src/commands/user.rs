//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! bamazon-cli user create -e ada@example.com -p secret
//! ```

use thiserror::Error;

use bamazon_shop::config::{ConfigError, ShopConfig};
use bamazon_shop::db;
use bamazon_shop::services::auth::{AuthError, AuthService};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Create a shop user with the given password.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `UserError::Auth` if the email is invalid, the password is too
/// short, or the email is already registered.
pub async fn create(email: &str, password: &str) -> Result<i32, UserError> {
    let config = ShopConfig::from_env()?;

    tracing::info!("Connecting to shop database...");
    let pool = db::create_pool(&config.database_url).await?;

    let user = AuthService::new(&pool)
        .signup(email, password, password)
        .await?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(user.id.as_i32())
}
