//! Staff access requests.
//!
//! There is no request queue yet: the page only acknowledges the request.
//! The owner grants roles from the admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::{IntoResponse, Redirect};
use tower_sessions::Session;

use crate::middleware::OptionalUser;
use crate::routes::layout::Chrome;
use crate::services::Toast;
use crate::services::notifications::notify;

/// Access request page template.
#[derive(Template, WebTemplate)]
#[template(path = "request_access.html")]
pub struct RequestAccessTemplate {
    pub chrome: Chrome,
}

/// Display the access request page.
pub async fn page(OptionalUser(signed_in): OptionalUser, session: Session) -> impl IntoResponse {
    RequestAccessTemplate {
        chrome: Chrome::load(&session, signed_in.as_ref().map(|s| &s.user)).await,
    }
}

/// Acknowledge an access request.
pub async fn submit(OptionalUser(signed_in): OptionalUser, session: Session) -> impl IntoResponse {
    if let Some(signed_in) = &signed_in {
        tracing::info!(user_id = %signed_in.user.id, "Staff access requested");
    }

    notify(
        &session,
        Toast::info(
            "Request Sent",
            "Your request has been sent to the store owner.",
        ),
    )
    .await;
    Redirect::to("/")
}
