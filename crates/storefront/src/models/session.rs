//! Per-browser state kept in the session store.
//!
//! The signed-in [`AuthSession`](crate::supabase::AuthSession), the cart,
//! and queued notifications all live here until the session expires.

use tower_sessions::Session;

use quickmart_core::Cart;

use crate::supabase::AuthSession;

/// Session keys.
pub mod keys {
    /// Key for the signed-in auth session (tokens plus user).
    pub const AUTH_SESSION: &str = "auth_session";

    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for queued toast notifications.
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Load the stored auth session, if any.
pub async fn auth_session(session: &Session) -> Option<AuthSession> {
    session
        .get::<AuthSession>(keys::AUTH_SESSION)
        .await
        .ok()
        .flatten()
}

/// Store the auth session after sign-in or refresh.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::AUTH_SESSION, auth).await
}

/// Forget the auth session (sign-out or failed refresh).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<AuthSession>(keys::AUTH_SESSION).await?;
    Ok(())
}

/// Load the cart (empty if none is stored).
pub async fn cart(session: &Session) -> Cart {
    session
        .get::<Cart>(keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}
