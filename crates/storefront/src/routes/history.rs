//! Order history.
//!
//! Customers see their own orders; staff see every order with the
//! customer's name.

use std::collections::{HashMap, HashSet};

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use quickmart_core::{Order, OrderItem, Profile, UserId};

use crate::db::{OrderRepository, ProfileRepository};
use crate::middleware::{RequireUser, SignedIn};
use crate::routes::layout::Chrome;
use crate::state::AppState;

/// Shown when an order's customer has no profile.
pub const UNKNOWN_CUSTOMER: &str = "Unknown";

/// Order line display data.
#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub name: String,
    pub emoji: String,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            name: item.name.clone(),
            emoji: item.emoji.clone(),
            quantity: item.quantity,
            line_total: item.line_total().to_string(),
        }
    }
}

/// Order display data.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub reference: String,
    pub placed_at: String,
    pub customer: String,
    pub total: String,
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    fn new(order: &Order, customer: String) -> Self {
        Self {
            reference: order.reference(),
            placed_at: order.created_at.format("%d %b %Y, %H:%M").to_string(),
            customer,
            total: order.total.to_string(),
            items: order.items.iter().map(OrderItemView::from).collect(),
        }
    }
}

/// Order views with each customer's name looked up in `profiles`.
#[must_use]
pub fn with_customer_names(orders: &[Order], profiles: &[Profile]) -> Vec<OrderView> {
    let names: HashMap<UserId, &str> = profiles
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();

    orders
        .iter()
        .map(|order| {
            let customer = names
                .get(&order.user_id)
                .copied()
                .unwrap_or(UNKNOWN_CUSTOMER);
            OrderView::new(order, customer.to_string())
        })
        .collect()
}

/// Every order, newest first, joined with customer names.
pub async fn all_orders_with_names(state: &AppState, signed_in: &SignedIn) -> Vec<OrderView> {
    let rest = state.supabase().rest();
    let orders = OrderRepository::new(rest)
        .as_user(signed_in.token())
        .get_all_orders()
        .await;

    let mut seen = HashSet::new();
    let ids: Vec<UserId> = orders
        .iter()
        .map(|o| o.user_id)
        .filter(|id| seen.insert(*id))
        .collect();
    let profiles = ProfileRepository::new(rest)
        .as_user(signed_in.token())
        .get_profiles_by_ids(&ids)
        .await;

    with_customer_names(&orders, &profiles)
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "history.html")]
pub struct HistoryTemplate {
    pub chrome: Chrome,
    pub all_orders: bool,
    pub orders: Vec<OrderView>,
}

/// Display order history.
#[instrument(skip_all, fields(user_id = %signed_in.user.id))]
pub async fn history(
    State(state): State<AppState>,
    RequireUser(signed_in): RequireUser,
    session: Session,
) -> impl IntoResponse {
    let all_orders = signed_in.user.is_staff();

    let orders = if all_orders {
        all_orders_with_names(&state, &signed_in).await
    } else {
        OrderRepository::new(state.supabase().rest())
            .as_user(signed_in.token())
            .get_user_orders(signed_in.user.id)
            .await
            .iter()
            .map(|order| OrderView::new(order, signed_in.user.name.clone()))
            .collect()
    };

    HistoryTemplate {
        chrome: Chrome::load(&session, Some(&signed_in.user)).await,
        all_orders,
        orders,
    }
}
