//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Storefront (search, category filter, cart panel)
//!
//! # Cart (form posts, redirect back to /)
//! POST /cart/add                      - Add one unit of a product
//! POST /cart/update                   - Change a line's quantity by +1/-1
//! POST /cart/remove                   - Remove a line
//! POST /cart/clear                    - Empty the cart
//!
//! # Auth
//! GET  /auth                          - Sign-in and sign-up forms
//! POST /auth/login                    - Sign in
//! POST /auth/register                 - Sign up
//! POST /auth/logout                   - Sign out
//!
//! # Access requests
//! GET  /request-access                - Request staff access
//! POST /request-access                - Send the request
//!
//! # Orders
//! GET  /history                       - Order history (every order for staff)
//! GET  /bill                          - Bill for the current cart
//! POST /bill/confirm                  - Save the order and clear the cart
//!
//! # Admin (staff)
//! GET  /admin?tab=...                 - Dashboard: customers, orders, products, admins
//! POST /admin/products                - Create product
//! POST /admin/products/{id}           - Update product
//! POST /admin/products/{id}/delete    - Delete product
//! POST /admin/users/{id}/role         - Assign admin/customer (owner only)
//! ```
//!
//! Unknown paths redirect to `/`.

pub mod admin;
pub mod auth;
pub mod bill;
pub mod cart;
pub mod history;
pub mod home;
pub mod layout;
pub mod request_access;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::auth_page))
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/products", post(admin::create_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/users/{id}/role", post(admin::update_role))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes())
        .route(
            "/request-access",
            get(request_access::page).post(request_access::submit),
        )
        .route("/history", get(history::history))
        .route("/bill", get(bill::show))
        .route("/bill/confirm", post(bill::confirm))
        .nest("/admin", admin_routes())
        .fallback(|| async { Redirect::to("/") })
}
