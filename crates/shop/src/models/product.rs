//! Product domain type and admin form validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use bamazon_core::{ProductId, UserId};

/// A product listed in the shop.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub description: String,
    /// Public path of the stored image, e.g. `/images/<uuid>-mug.png`.
    pub image_path: String,
    /// Owner; only this user may edit or delete the product.
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Price formatted with two decimal places.
    #[must_use]
    pub fn display_price(&self) -> String {
        format!("{:.2}", self.price.round_dp(2))
    }
}

const MIN_TITLE_CHARS: usize = 3;
const MIN_DESCRIPTION_CHARS: usize = 5;
const MAX_DESCRIPTION_CHARS: usize = 400;

/// Why a product form was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductValidationError {
    #[error("Title must be at least {MIN_TITLE_CHARS} characters.")]
    TitleTooShort,
    #[error("Price must be a positive number.")]
    InvalidPrice,
    #[error(
        "Description must be between {MIN_DESCRIPTION_CHARS} and {MAX_DESCRIPTION_CHARS} characters."
    )]
    DescriptionLength,
}

/// Raw product fields as submitted by the admin form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductInput {
    pub title: String,
    pub price: String,
    pub description: String,
}

/// Product fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProduct {
    pub title: String,
    pub price: Decimal,
    pub description: String,
}

impl ProductInput {
    /// Validate and normalise the submitted fields.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks.
    pub fn validate(&self) -> Result<ValidProduct, ProductValidationError> {
        let title = self.title.trim();
        if title.chars().count() < MIN_TITLE_CHARS {
            return Err(ProductValidationError::TitleTooShort);
        }

        let price = self
            .price
            .trim()
            .parse::<Decimal>()
            .ok()
            .filter(|p| p.is_sign_positive() && !p.is_zero())
            .ok_or(ProductValidationError::InvalidPrice)?;

        let description = self.description.trim();
        let len = description.chars().count();
        if !(MIN_DESCRIPTION_CHARS..=MAX_DESCRIPTION_CHARS).contains(&len) {
            return Err(ProductValidationError::DescriptionLength);
        }

        Ok(ValidProduct {
            title: title.to_owned(),
            price: price.round_dp(2),
            description: description.to_owned(),
        })
    }
}

impl From<&Product> for ProductInput {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.display_price(),
            description: product.description.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(title: &str, price: &str, description: &str) -> ProductInput {
        ProductInput {
            title: title.to_owned(),
            price: price.to_owned(),
            description: description.to_owned(),
        }
    }

    #[test]
    fn test_valid_input_is_trimmed_and_rounded() {
        let valid = input("  Coffee Mug ", "12.499", " A sturdy mug. ")
            .validate()
            .unwrap();
        assert_eq!(valid.title, "Coffee Mug");
        assert_eq!(valid.price, Decimal::new(1250, 2));
        assert_eq!(valid.description, "A sturdy mug.");
    }

    #[test]
    fn test_short_title() {
        assert_eq!(
            input("ab", "1", "long enough").validate(),
            Err(ProductValidationError::TitleTooShort)
        );
    }

    #[test]
    fn test_bad_prices() {
        for price in ["", "free", "0", "-3.50"] {
            assert_eq!(
                input("Mug", price, "long enough").validate(),
                Err(ProductValidationError::InvalidPrice),
                "price {price:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_description_bounds() {
        assert_eq!(
            input("Mug", "1", "tiny").validate(),
            Err(ProductValidationError::DescriptionLength)
        );
        assert_eq!(
            input("Mug", "1", &"x".repeat(401)).validate(),
            Err(ProductValidationError::DescriptionLength)
        );
        assert!(input("Mug", "1", &"x".repeat(400)).validate().is_ok());
    }

    #[test]
    fn test_display_price() {
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(1),
            title: "Mug".to_owned(),
            price: Decimal::new(7, 0),
            description: "A mug".to_owned(),
            image_path: "images/x-mug.png".to_owned(),
            user_id: UserId::new(1),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(product.display_price(), "7.00");
    }
}
