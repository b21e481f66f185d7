//! Per-session toast notifications.
//!
//! Each browser session owns a small queue of toasts. Handlers push a toast
//! before redirecting; the next rendered page takes them.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::session_keys;

/// Toasts kept per session.
pub const TOAST_LIMIT: usize = 3;

/// Visual variant of a toast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

/// A transient message shown on the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub variant: ToastVariant,
}

impl Toast {
    /// A neutral toast.
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: Some(description.into()),
            variant: ToastVariant::Default,
        }
    }

    /// An error toast.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            ..Self::info(title, description)
        }
    }

    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

/// Toast queue, newest first, capped at [`TOAST_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    toasts: Vec<Toast>,
}

impl Notifications {
    /// Add a toast in front, dropping the oldest beyond the limit.
    pub fn push(&mut self, toast: Toast) {
        self.toasts.insert(0, toast);
        self.toasts.truncate(TOAST_LIMIT);
    }

    /// Remove and return every toast.
    pub fn take(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    /// Remove one toast. Returns `false` if it was not queued.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    #[must_use]
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }
}

/// Queue a toast for the session's next page.
pub async fn notify(session: &Session, toast: Toast) {
    let mut notifications = load(session).await;
    notifications.push(toast);
    if let Err(e) = session
        .insert(session_keys::NOTIFICATIONS, &notifications)
        .await
    {
        tracing::error!(error = %e, "Failed to store notification");
    }
}

/// Take every queued toast for rendering.
pub async fn take_notifications(session: &Session) -> Vec<Toast> {
    match session
        .remove::<Notifications>(session_keys::NOTIFICATIONS)
        .await
    {
        Ok(notifications) => notifications.unwrap_or_default().take(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read notifications");
            Vec::new()
        }
    }
}

async fn load(session: &Session) -> Notifications {
    session
        .get::<Notifications>(session_keys::NOTIFICATIONS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_newest_three() {
        let mut notifications = Notifications::default();
        for i in 0..5 {
            notifications.push(Toast::info(format!("t{i}"), ""));
        }

        let titles: Vec<_> = notifications.toasts().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["t4", "t3", "t2"]);
    }

    #[test]
    fn test_take_drains() {
        let mut notifications = Notifications::default();
        notifications.push(Toast::info("Request Sent", "The owner will review it."));
        assert_eq!(notifications.take().len(), 1);
        assert!(notifications.take().is_empty());
    }

    #[test]
    fn test_dismiss_by_id() {
        let mut notifications = Notifications::default();
        let keep = Toast::info("keep", "");
        let drop_me = Toast::error("drop", "");
        let drop_id = drop_me.id;
        notifications.push(keep);
        notifications.push(drop_me);

        assert!(notifications.dismiss(drop_id));
        assert!(!notifications.dismiss(drop_id));
        assert_eq!(notifications.toasts().len(), 1);
        assert_eq!(notifications.toasts()[0].title, "keep");
    }

    #[test]
    fn test_error_toast_is_destructive() {
        assert!(Toast::error("Login Failed", "bad password").is_destructive());
        assert!(!Toast::info("Welcome", "").is_destructive());
    }
}
