//! Authentication extractors.
//!
//! The browser session stores the [`AuthSession`]; the extractors load it,
//! exchange an expired access token once for a fresh one, and ask the
//! [`SessionMirror`](crate::services::SessionMirror) for the resolved user.
//! Any failure along the way counts as signed out.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use tower_sessions::Session;

use quickmart_core::CurrentUser;

use crate::models::session::{auth_session, clear_auth_session, set_auth_session};
use crate::state::AppState;
use crate::supabase::AuthSession;

/// A signed-in user together with the session that authenticated them.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: CurrentUser,
    pub auth: AuthSession,
}

impl SignedIn {
    /// Access token for row-level-security requests.
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.auth.access_token
    }
}

/// Resolve the signed-in user for a browser session.
///
/// Refreshes an expired token once; if that fails the stored session is
/// dropped and the request is treated as anonymous.
pub async fn load_signed_in(state: &AppState, session: &Session) -> Option<SignedIn> {
    let stored = auth_session(session).await?;

    let auth = if stored.is_expired() {
        match state.supabase().auth().refresh_session(&stored).await {
            Ok(fresh) => {
                if let Err(e) = set_auth_session(session, &fresh).await {
                    tracing::error!(error = %e, "Failed to store refreshed session");
                }
                fresh
            }
            Err(e) => {
                tracing::info!(error = %e, "Session refresh failed, signing out");
                if let Err(e) = clear_auth_session(session).await {
                    tracing::error!(error = %e, "Failed to clear session");
                }
                return None;
            }
        }
    } else {
        stored
    };

    let user = state.mirror().current(&auth).await?;
    Some(SignedIn { user, auth })
}

/// Rejection for the authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in: send to the sign-in page.
    RedirectToLogin,
    /// No session layer on this route.
    Unauthorized,
    /// Signed in, but the role is not enough.
    Forbidden(&'static str),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message).into_response(),
        }
    }
}

async fn require_signed_in(parts: &Parts, state: &AppState) -> Result<SignedIn, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    load_signed_in(state, session)
        .await
        .ok_or(AuthRejection::RedirectToLogin)
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn history(RequireUser(signed_in): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", signed_in.user.name)
/// }
/// ```
pub struct RequireUser(pub SignedIn);

impl<S> FromRequestParts<S> for RequireUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        require_signed_in(parts, &state).await.map(Self)
    }
}

/// Extractor that requires an owner or admin.
pub struct RequireStaff(pub SignedIn);

impl<S> FromRequestParts<S> for RequireStaff
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let signed_in = require_signed_in(parts, &state).await?;

        if !signed_in.user.is_staff() {
            return Err(AuthRejection::Forbidden("Only staff can access this page"));
        }
        Ok(Self(signed_in))
    }
}

/// Extractor that requires the owner.
pub struct RequireOwner(pub SignedIn);

impl<S> FromRequestParts<S> for RequireOwner
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let signed_in = require_signed_in(parts, &state).await?;

        if !signed_in.user.role.can_assign_roles() {
            return Err(AuthRejection::Forbidden("Only the owner can manage roles"));
        }
        Ok(Self(signed_in))
    }
}

/// Extractor that optionally gets the signed-in user.
pub struct OptionalUser(pub Option<SignedIn>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let signed_in = match parts.extensions.get::<Session>() {
            Some(session) => load_signed_in(&state, session).await,
            None => None,
        };
        Ok(Self(signed_in))
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_responses() {
        let redirect = AuthRejection::RedirectToLogin.into_response();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
        assert_eq!(redirect.headers()["location"], "/auth");

        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden("nope").into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
