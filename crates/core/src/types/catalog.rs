//! Storefront catalog helpers.

use std::collections::HashSet;

use super::product::Product;

/// Unique categories, in the order they first appear in `products`.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen = HashSet::new();
    products
        .iter()
        .filter(|p| seen.insert(p.category.as_str()))
        .map(|p| p.category.clone())
        .collect()
}

/// Products whose name contains `query` (case-insensitive) and, when a
/// category is selected, whose category matches it exactly.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [Product],
    query: &str,
    category: Option<&str>,
) -> Vec<&'a Product> {
    let needle = query.trim().to_lowercase();
    products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .filter(|p| category.is_none_or(|c| p.category == c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{id::ProductId, price::Price};

    fn catalog() -> Vec<Product> {
        [
            (1, "Basmati Rice", "Grains"),
            (2, "Toned Milk", "Dairy"),
            (3, "Brown Rice", "Grains"),
            (4, "Paneer", "Dairy"),
            (5, "Green Tea", "Beverages"),
        ]
        .into_iter()
        .map(|(id, name, category)| Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Price::from_rupees(10),
            category: category.to_string(),
            emoji: String::new(),
        })
        .collect()
    }

    #[test]
    fn test_categories_first_seen_order() {
        assert_eq!(categories(&catalog()), ["Grains", "Dairy", "Beverages"]);
        assert!(categories(&[]).is_empty());
    }

    #[test]
    fn test_filter_by_query_case_insensitive() {
        let products = catalog();
        let names: Vec<_> = filter_products(&products, "RICE", None)
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["Basmati Rice", "Brown Rice"]);
    }

    #[test]
    fn test_filter_by_category_and_query() {
        let products = catalog();
        assert_eq!(filter_products(&products, "", Some("Dairy")).len(), 2);
        assert_eq!(filter_products(&products, "milk", Some("Dairy")).len(), 1);
        assert!(filter_products(&products, "milk", Some("Grains")).is_empty());
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let products = catalog();
        assert_eq!(filter_products(&products, "  ", None).len(), products.len());
    }
}
