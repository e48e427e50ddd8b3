//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ShopConfig;
use crate::db::{PgUserStore, UserStore};

/// Application state shared across all handlers and middleware.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ShopConfig,
    pool: PgPool,
    users: Arc<dyn UserStore>,
}

impl AppState {
    /// Create state whose user lookups go to the `users` table.
    #[must_use]
    pub fn new(config: ShopConfig, pool: PgPool) -> Self {
        let users = Arc::new(PgUserStore::new(pool.clone()));
        Self::with_user_store(config, pool, users)
    }

    /// Create state with a custom user lookup for authentication hydration.
    #[must_use]
    pub fn with_user_store(config: ShopConfig, pool: PgPool, users: Arc<dyn UserStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                users,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ShopConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The user lookup used by authentication hydration.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }
}
