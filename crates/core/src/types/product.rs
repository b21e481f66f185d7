//! Catalog products and the admin product form.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product as shown in the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: String,
    /// Icon glyph shown next to the name. May be empty.
    pub emoji: String,
}

/// Validation failures for the admin product form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductDraftError {
    #[error("All fields are required")]
    MissingField,
    #[error("Price must be a positive number")]
    InvalidPrice,
}

/// Validated input for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub price: Price,
    pub category: String,
    pub emoji: String,
}

impl ProductDraft {
    /// Validate raw form fields.
    ///
    /// Every field must be non-blank and the price must parse as a positive
    /// decimal.
    ///
    /// # Errors
    ///
    /// Returns [`ProductDraftError::MissingField`] if any field is blank and
    /// [`ProductDraftError::InvalidPrice`] if the price is not a positive number.
    pub fn parse(
        name: &str,
        price: &str,
        category: &str,
        emoji: &str,
    ) -> Result<Self, ProductDraftError> {
        let (name, price, category, emoji) =
            (name.trim(), price.trim(), category.trim(), emoji.trim());
        if [name, price, category, emoji].iter().any(|f| f.is_empty()) {
            return Err(ProductDraftError::MissingField);
        }

        let price = Decimal::from_str(price)
            .map(Price::new)
            .map_err(|_| ProductDraftError::InvalidPrice)?;
        if !price.is_positive() {
            return Err(ProductDraftError::InvalidPrice);
        }

        Ok(Self {
            name: name.to_string(),
            price,
            category: category.to_string(),
            emoji: emoji.to_string(),
        })
    }
}
