//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quickmart_core::{Price, Product, ProductDraft, ProductId};

use super::RepositoryError;
use crate::supabase::RestClient;

const TABLE: &str = "products";

/// A row of the `products` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: Price::new(row.price),
            category: row.category,
            emoji: row.emoji.unwrap_or_default(),
        }
    }
}

/// Insert/update body built from a validated draft.
#[derive(Debug, Serialize)]
struct ProductWrite<'a> {
    name: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    category: &'a str,
    emoji: &'a str,
}

impl<'a> From<&'a ProductDraft> for ProductWrite<'a> {
    fn from(draft: &'a ProductDraft) -> Self {
        Self {
            name: &draft.name,
            price: draft.price.amount(),
            category: &draft.category,
            emoji: &draft.emoji,
        }
    }
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    rest: &'a RestClient,
    token: Option<&'a SecretString>,
}

impl<'a> ProductRepository<'a> {
    /// Create a repository that reads anonymously.
    #[must_use]
    pub const fn new(rest: &'a RestClient) -> Self {
        Self { rest, token: None }
    }

    /// Act as the signed-in user (needed for writes under row-level security).
    #[must_use]
    pub const fn as_user(mut self, token: &'a SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// All products ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the request fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = self
            .rest
            .table(TABLE)
            .select("*")
            .order("id", true)
            .with_token(self.token)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// All products ordered by id, or an empty list if the read fails.
    pub async fn get_products(&self) -> Vec<Product> {
        match self.list().await {
            Ok(products) => products,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load products");
                Vec::new()
            }
        }
    }

    /// Create a product and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert is rejected.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn add_product(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let row: ProductRow = self
            .rest
            .table(TABLE)
            .with_token(self.token)
            .insert(&ProductWrite::from(draft))
            .await?;
        tracing::info!(product_id = row.id, "Product created");
        Ok(row.into())
    }

    /// Replace a product's fields and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    #[instrument(skip(self, draft))]
    pub async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let row: ProductRow = self
            .rest
            .table(TABLE)
            .eq("id", id)
            .with_token(self.token)
            .update(&ProductWrite::from(draft))
            .await?;
        tracing::info!("Product updated");
        Ok(row.into())
    }

    /// Delete a product. Carts holding it keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete is rejected.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.rest
            .table(TABLE)
            .eq("id", id)
            .with_token(self.token)
            .delete()
            .await?;
        tracing::info!("Product deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_row_with_numeric_price_maps_to_product() {
        let row: ProductRow = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Basmati Rice",
            "price": 45.5,
            "category": "Grains",
            "emoji": "🍚",
            "created_at": "2026-10-17T09:30:00+00:00"
        }))
        .unwrap();

        let product = Product::from(row);
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Price::new(Decimal::from_str("45.5").unwrap()));
        assert_eq!(product.emoji, "🍚");
    }

    #[test]
    fn test_missing_emoji_becomes_empty() {
        let row: ProductRow = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Salt", "price": 20, "category": "Pantry", "emoji": null
        }))
        .unwrap();
        assert_eq!(Product::from(row).emoji, "");
    }

    #[test]
    fn test_write_body_sends_price_as_number() {
        let draft = ProductDraft::parse("Paneer", "120.50", "Dairy", "🧀").unwrap();
        let body = serde_json::to_value(ProductWrite::from(&draft)).unwrap();
        assert_eq!(body["price"], serde_json::json!(120.5));
        assert_eq!(body["name"], "Paneer");
        assert!(body.get("id").is_none());
    }
}
