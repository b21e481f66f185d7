//! Storefront page: product grid, search, category filter and cart panel.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use quickmart_core::{Product, categories, filter_products};

use crate::middleware::RequireUser;
use crate::models::session::cart;
use crate::routes::cart::CartView;
use crate::routes::layout::Chrome;
use crate::state::AppState;

/// Search and filter query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct StorefrontQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

impl StorefrontQuery {
    fn search(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }
}

/// Product card display data.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub price: String,
    pub category: String,
    pub emoji: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            price: product.price.to_string(),
            category: product.category.clone(),
            emoji: product.emoji.clone(),
        }
    }
}

/// One entry of the category filter.
#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub name: String,
    pub selected: bool,
}

/// Storefront page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: Chrome,
    pub query: String,
    pub all_selected: bool,
    pub categories: Vec<CategoryOption>,
    pub products: Vec<ProductView>,
    pub cart: CartView,
}

/// Build the category options for the current selection.
fn category_options(products: &[Product], selected: Option<&str>) -> Vec<CategoryOption> {
    categories(products)
        .into_iter()
        .map(|name| CategoryOption {
            selected: selected == Some(name.as_str()),
            name,
        })
        .collect()
}

/// Display the storefront.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    RequireUser(signed_in): RequireUser,
    session: Session,
    Query(query): Query<StorefrontQuery>,
) -> impl IntoResponse {
    let snapshot = state.catalog().snapshot();
    let selected = query.category();

    let products = filter_products(&snapshot, query.search(), selected)
        .into_iter()
        .map(ProductView::from)
        .collect();

    let cart = CartView::from(&cart(&session).await);

    HomeTemplate {
        chrome: Chrome::load(&session, Some(&signed_in.user)).await,
        query: query.search().to_string(),
        all_selected: selected.is_none(),
        categories: category_options(&snapshot, selected),
        products,
        cart,
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use quickmart_core::{Price, ProductId};

    use super::*;

    fn product(id: i64, name: &str, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Price::from_rupees(10),
            category: category.to_string(),
            emoji: String::new(),
        }
    }

    #[test]
    fn test_blank_category_means_all() {
        let query = StorefrontQuery {
            q: None,
            category: Some(String::new()),
        };
        assert_eq!(query.category(), None);
        assert_eq!(query.search(), "");
    }

    #[test]
    fn test_category_options_mark_selection() {
        let products = [
            product(1, "Basmati Rice", "Grains"),
            product(2, "Toned Milk", "Dairy"),
            product(3, "Brown Rice", "Grains"),
        ];

        let options = category_options(&products, Some("Dairy"));
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].name, "Grains");
        assert!(!options[0].selected);
        assert!(options[1].selected);
    }
}
