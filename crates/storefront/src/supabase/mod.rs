//! Thin clients for the hosted backend (Supabase).
//!
//! # APIs
//!
//! - REST (`PostgREST`) for the `products`, `profiles` and `orders` tables.
//!   Row-level security is enforced by the platform, so writes carry the
//!   signed-in user's access token.
//! - Auth (`GoTrue`) for password sign-in, sign-up, refresh and sign-out.
//!   Session changes are broadcast as [`AuthChange`] events.
//! - Realtime (Phoenix channels over a websocket) for the product change feed.
//!
//! # Example
//!
//! ```rust,ignore
//! use quickmart_storefront::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::new(&config.supabase);
//! let session = client.auth().sign_in_with_password("a@b.in", "secret").await?;
//! let rows: Vec<ProductRow> = client.rest().table("products").order("id", true).fetch().await?;
//! ```

pub mod auth;
pub mod realtime;
pub mod rest;

pub use auth::{AuthChange, AuthClient, AuthSession, AuthUser, SignUpOutcome};
pub use realtime::{CatalogSignal, ProductListener};
pub use rest::RestClient;

use serde::Deserialize;
use thiserror::Error;

use crate::config::SupabaseConfig;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The requested row does not exist.
    #[error("Not found")]
    NotFound,

    /// Rejected by row-level security or the auth server.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Rate limited by the platform.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SupabaseError {
    /// Map an error status and body to an error.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(ApiErrorBody::message)
            .unwrap_or_else(|| body.chars().take(200).collect());
        let code = parsed.and_then(|p| p.code_str());

        match status.as_u16() {
            401 | 403 => Self::PermissionDenied(message),
            404 => Self::NotFound,
            // Single-row request matched zero rows
            406 if code.as_deref() == Some("PGRST116") => Self::NotFound,
            status => Self::Api { status, message },
        }
    }

    /// Whether the API reported a unique constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
    }
}

/// Error body shapes returned by `PostgREST` and `GoTrue`.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    code: Option<serde_json::Value>,
}

impl ApiErrorBody {
    fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }

    fn code_str(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::String(code) => Some(code.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Read `Retry-After` from a 429 response (defaults to one second).
pub(crate) fn retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1)
}

/// Truncate a response body for logging.
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(500).collect()
}

// =============================================================================
// SupabaseClient
// =============================================================================

/// Bundles the REST and auth clients for one project.
///
/// Both share one `reqwest::Client` connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    rest: RestClient,
    auth: AuthClient,
}

impl SupabaseClient {
    /// Create clients for the configured project.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        let http = reqwest::Client::new();
        Self {
            rest: RestClient::new(http.clone(), config.rest_url(), config.anon_key.clone()),
            auth: AuthClient::new(http, config.auth_url(), config.anon_key.clone()),
        }
    }

    /// REST client for table access.
    #[must_use]
    pub const fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Auth client.
    #[must_use]
    pub const fn auth(&self) -> &AuthClient {
        &self.auth
    }
}
