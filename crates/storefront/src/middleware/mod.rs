//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Session layer (tower-sessions, in-memory store)
//! 4. Visitor tracking (page view log)
//!
//! Authentication is done per handler with the extractors in [`auth`].

pub mod auth;
pub mod session;
pub mod visits;

pub use auth::{OptionalUser, RequireOwner, RequireStaff, RequireUser, SignedIn, load_signed_in};
pub use session::create_session_layer;
pub use visits::track_visits;
