//! Page chrome shared by every template: navigation and pending toasts.

use tower_sessions::Session;

use quickmart_core::CurrentUser;

use crate::services::Toast;
use crate::services::notifications::take_notifications;

/// Navigation bar data for a signed-in user.
#[derive(Debug, Clone)]
pub struct NavView {
    pub name: String,
    pub role: String,
    pub is_staff: bool,
    pub item_count: u32,
}

/// A toast ready for rendering.
#[derive(Debug, Clone)]
pub struct ToastView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl From<Toast> for ToastView {
    fn from(toast: Toast) -> Self {
        Self {
            destructive: toast.is_destructive(),
            id: toast.id.to_string(),
            title: toast.title,
            description: toast.description.unwrap_or_default(),
        }
    }
}

/// Everything `base.html` needs around the page body.
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub nav: Option<NavView>,
    pub toasts: Vec<ToastView>,
}

impl Chrome {
    /// Build the chrome and drain the session's toasts.
    pub async fn load(session: &Session, user: Option<&CurrentUser>) -> Self {
        let nav = match user {
            Some(user) => Some(NavView {
                name: user.name.clone(),
                role: user.role.to_string(),
                is_staff: user.is_staff(),
                item_count: crate::models::session::cart(session).await.item_count(),
            }),
            None => None,
        };

        let toasts = take_notifications(session)
            .await
            .into_iter()
            .map(ToastView::from)
            .collect();

        Self { nav, toasts }
    }

    /// Description of the newest destructive toast, if any.
    #[must_use]
    pub fn latest_error(&self) -> Option<String> {
        self.toasts
            .iter()
            .find(|t| t.destructive)
            .map(|t| t.description.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_view_from_toast() {
        let view = ToastView::from(Toast::error("Login Failed", "Invalid login credentials"));
        assert!(view.destructive);
        assert_eq!(view.title, "Login Failed");
        assert_eq!(view.description, "Invalid login credentials");
    }

    #[test]
    fn test_latest_error_picks_first_destructive() {
        let chrome = Chrome {
            nav: None,
            toasts: vec![
                Toast::info("Welcome", "").into(),
                Toast::error("Sign Up Failed", "User already registered").into(),
            ],
        };
        assert_eq!(
            chrome.latest_error().as_deref(),
            Some("User already registered")
        );
    }
}
