//! Product repository.
//!
//! Mutations are scoped to the owning user: an update or delete that names a
//! product the caller does not own affects no rows and reports `NotFound`.

use sqlx::PgPool;

use bamazon_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::Product;
use crate::models::product::ValidProduct;

const PRODUCT_COLUMNS: &str =
    "id, title, price, description, image_path, user_id, created_at, updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Products created by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Fetch several products in one round-trip. Missing IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner: UserId,
        fields: &ValidProduct,
        image_path: &str,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (title, price, description, image_path, user_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&fields.title)
        .bind(fields.price)
        .bind(&fields.description)
        .bind(image_path)
        .bind(owner)
        .fetch_one(self.pool)
        .await?;
        Ok(product)
    }

    /// Update a product owned by `owner`. `image_path` of `None` keeps the current image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product with that ID is owned by `owner`.
    pub async fn update_owned(
        &self,
        owner: UserId,
        id: ProductId,
        fields: &ValidProduct,
        image_path: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products \
             SET title = $3, price = $4, description = $5, \
                 image_path = COALESCE($6, image_path), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(&fields.title)
        .bind(fields.price)
        .bind(&fields.description)
        .bind(image_path)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product owned by `owner`, returning the deleted row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product with that ID is owned by `owner`.
    pub async fn delete_owned(
        &self,
        owner: UserId,
        id: ProductId,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "DELETE FROM products WHERE id = $1 AND user_id = $2 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
