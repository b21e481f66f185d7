//! Cart route handlers.
//!
//! The cart lives in the browser session. Each form post changes it and
//! redirects back to the storefront.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use quickmart_core::{Cart, CartItem, ProductId};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::session::{cart, set_cart};
use crate::services::Toast;
use crate::services::notifications::notify;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: i64,
    pub name: String,
    pub emoji: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id.as_i64(),
            name: item.product.name.clone(),
            emoji: item.product.emoji.clone(),
            quantity: item.quantity,
            unit_price: item.product.price.to_string(),
            line_total: item.line_total().to_string(),
        }
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartLineView::from).collect(),
            subtotal: cart.subtotal().to_string(),
            item_count: cart.item_count(),
        }
    }
}

/// Form naming a cart line.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub product_id: ProductId,
}

/// Quantity change form. Any positive delta adds one, any negative removes one.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub product_id: ProductId,
    pub delta: i32,
}

/// Add one unit of a product to the cart.
///
/// The product is snapshotted from the live catalog, so later edits don't
/// change what's already in the cart.
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let Some(product) = state.catalog().product(form.product_id) else {
        notify(
            &session,
            Toast::error("Unavailable", "That product is no longer in the catalog."),
        )
        .await;
        return Ok(Redirect::to("/").into_response());
    };

    let mut current = cart(&session).await;
    current.add(product);
    set_cart(&session, &current).await?;
    Ok(Redirect::to("/").into_response())
}

/// Change a line's quantity by one.
#[instrument(skip_all)]
pub async fn update(
    RequireUser(_): RequireUser,
    session: Session,
    Form(form): Form<UpdateForm>,
) -> Result<Response> {
    let delta = form.delta.signum();
    if delta != 0 {
        let mut current = cart(&session).await;
        if current.update_quantity(form.product_id, delta) {
            set_cart(&session, &current).await?;
        }
    }
    Ok(Redirect::to("/").into_response())
}

/// Remove a line from the cart.
#[instrument(skip_all)]
pub async fn remove(
    RequireUser(_): RequireUser,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let mut current = cart(&session).await;
    if current.remove(form.product_id) {
        set_cart(&session, &current).await?;
    }
    Ok(Redirect::to("/").into_response())
}

/// Empty the cart.
#[instrument(skip_all)]
pub async fn clear(RequireUser(_): RequireUser, session: Session) -> Result<Response> {
    set_cart(&session, &Cart::new()).await?;
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use quickmart_core::{Price, Product};
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: i64, name: &str, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Price::new(Decimal::from_str(price).unwrap()),
            category: "Dairy".to_string(),
            emoji: "🥛".to_string(),
        }
    }

    #[test]
    fn test_cart_view_formats_prices() {
        let mut cart = Cart::new();
        cart.add(product(1, "Toned Milk", "30"));
        cart.add(product(1, "Toned Milk", "30"));
        cart.add(product(2, "Paneer", "90.5"));

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, "₹150.50");
        assert_eq!(view.items[0].quantity, 2);
        assert_eq!(view.items[0].line_total, "₹60.00");
        assert_eq!(view.items[1].unit_price, "₹90.50");
        assert!(!view.is_empty());
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::from(&Cart::new());
        assert!(view.is_empty());
        assert_eq!(view.item_count, 0);
        assert_eq!(view.subtotal, "₹0.00");
    }
}
