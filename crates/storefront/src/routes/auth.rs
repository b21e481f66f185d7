//! Authentication route handlers.
//!
//! Handles sign-in, sign-up and sign-out against the auth server. Failures
//! are reported as toasts on the `/auth` page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use quickmart_core::{Cart, CurrentUser};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::OptionalUser;
use crate::models::session::{auth_session, clear_auth_session, set_auth_session, set_cart};
use crate::routes::layout::Chrome;
use crate::services::notifications::notify;
use crate::services::{AuthService, Toast};
use crate::state::AppState;
use crate::supabase::AuthSession;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Which form to show first.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub mode: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in / sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub chrome: Chrome,
    pub error: Option<String>,
    pub show_signup: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the sign-in and sign-up forms.
///
/// Signed-in users are sent to the storefront.
pub async fn auth_page(
    OptionalUser(signed_in): OptionalUser,
    session: Session,
    Query(query): Query<AuthQuery>,
) -> Response {
    if signed_in.is_some() {
        return Redirect::to("/").into_response();
    }

    let chrome = Chrome::load(&session, None).await;
    AuthTemplate {
        error: chrome.latest_error(),
        chrome,
        show_signup: query.mode.as_deref() == Some("signup"),
    }
    .into_response()
}

/// Handle sign-in.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let service = AuthService::new(state.supabase(), state.mirror());

    match service.sign_in(&form.email, &form.password).await {
        Ok((auth, user)) => {
            start_session(&session, &auth, &user).await?;
            tracing::info!(user_id = %user.id, role = %user.role, "User signed in");
            notify(&session, Toast::info("Welcome back", user.name)).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::info!(error = %e, "Sign-in failed");
            notify(&session, Toast::error("Login Failed", e.to_string())).await;
            Ok(Redirect::to("/auth").into_response())
        }
    }
}

/// Handle sign-up.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let service = AuthService::new(state.supabase(), state.mirror());

    match service.sign_up(&form.name, &form.email, &form.password).await {
        Ok(Some((auth, user))) => {
            start_session(&session, &auth, &user).await?;
            tracing::info!(user_id = %user.id, "User signed up");
            notify(&session, Toast::info("Account created", user.name)).await;
            Ok(Redirect::to("/").into_response())
        }
        Ok(None) => {
            notify(
                &session,
                Toast::info(
                    "Check your email",
                    "Confirm your email address, then sign in.",
                ),
            )
            .await;
            Ok(Redirect::to("/auth").into_response())
        }
        Err(e) => {
            tracing::info!(error = %e, "Sign-up failed");
            notify(&session, Toast::error("Sign Up Failed", e.to_string())).await;
            Ok(Redirect::to("/auth?mode=signup").into_response())
        }
    }
}

/// Handle sign-out.
///
/// The browser session is cleared even if the auth server can't be reached.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response> {
    if let Some(auth) = auth_session(&session).await {
        AuthService::new(state.supabase(), state.mirror())
            .sign_out(&auth)
            .await;
    }

    clear_auth_session(&session).await?;
    set_cart(&session, &Cart::new()).await?;
    session.cycle_id().await?;
    clear_sentry_user();

    Ok(Redirect::to("/auth").into_response())
}

/// Store a fresh auth session and tag the error tracker with the user.
async fn start_session(session: &Session, auth: &AuthSession, user: &CurrentUser) -> Result<()> {
    // New id on privilege change
    session.cycle_id().await?;
    set_auth_session(session, auth).await?;
    set_sentry_user(&user.id, user.email.as_ref().map(|e| e.as_str()));
    Ok(())
}
