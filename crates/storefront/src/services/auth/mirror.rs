//! Local mirror of auth sessions.
//!
//! Resolves an [`AuthSession`] into a [`CurrentUser`] (profile lookup, role
//! resolution, first-sign-in provisioning) and caches the result by access
//! token. Request extractors read through [`SessionMirror::current`]; the
//! listener task keeps entries in step with auth events. Both paths end in
//! [`SessionMirror::sync`], so a user's role is only ever computed in one
//! place.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::ExposeSecret;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::instrument;

use quickmart_core::{CurrentUser, Email, Profile, UserId};

use crate::db::ProfileRepository;
use crate::supabase::{AuthChange, AuthSession, RestClient};

/// Resolved users kept at most this long (roles may change server-side).
const ENTRY_TTL: Duration = Duration::from_secs(300);

const MAX_ENTRIES: u64 = 10_000;

/// Cache of resolved users keyed by access token.
#[derive(Clone)]
pub struct SessionMirror {
    inner: Arc<SessionMirrorInner>,
}

struct SessionMirrorInner {
    rest: RestClient,
    owner_email: Option<Email>,
    users: Cache<String, CurrentUser>,
}

impl SessionMirror {
    /// Create an empty mirror.
    #[must_use]
    pub fn new(rest: RestClient, owner_email: Option<Email>) -> Self {
        let users = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(ENTRY_TTL)
            .support_invalidation_closures()
            .build();

        Self {
            inner: Arc::new(SessionMirrorInner {
                rest,
                owner_email,
                users,
            }),
        }
    }

    /// The user for a session, resolving it on first sight.
    pub async fn current(&self, session: &AuthSession) -> Option<CurrentUser> {
        if let Some(user) = self
            .inner
            .users
            .get(session.access_token.expose_secret())
            .await
        {
            return Some(user);
        }
        self.sync(Some(session)).await
    }

    /// Resolve a session into a user and remember the result.
    ///
    /// No session means no user. Otherwise the profile is looked up; a
    /// missing profile is provisioned with the default name and the customer
    /// role. If the lookup itself fails the user is resolved without a
    /// profile (owner email still applies) and nothing is cached, so the
    /// next request tries again.
    #[instrument(skip_all, fields(user_id))]
    pub async fn sync(&self, session: Option<&AuthSession>) -> Option<CurrentUser> {
        let session = session?;
        let identity = session.user.identity();
        tracing::Span::current().record("user_id", tracing::field::display(identity.user_id));

        let profiles = ProfileRepository::new(&self.inner.rest).as_user(&session.access_token);
        let owner_email = self.inner.owner_email.as_ref();

        let user = match profiles.get_profile(identity.user_id).await {
            Ok(Some(profile)) => CurrentUser::resolve(&identity, Some(&profile), owner_email),
            Ok(None) => {
                let provisional = Profile::provisional(&identity);
                let stored = match profiles.create_profile(&provisional).await {
                    Ok(stored) => stored,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to provision profile");
                        provisional
                    }
                };
                CurrentUser::resolve(&identity, Some(&stored), owner_email)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile lookup failed, using default policy");
                return Some(CurrentUser::resolve(&identity, None, owner_email));
            }
        };

        self.inner
            .users
            .insert(session.access_token.expose_secret().to_string(), user.clone())
            .await;
        Some(user)
    }

    /// Drop the entry for one access token.
    pub async fn forget(&self, access_token: &str) {
        self.inner.users.invalidate(access_token).await;
    }

    /// Drop every entry belonging to a user (e.g. after a role change).
    pub fn forget_user(&self, user_id: UserId) {
        if let Err(e) = self
            .inner
            .users
            .invalidate_entries_if(move |_, user| user.id == user_id)
        {
            tracing::warn!(error = %e, "Failed to invalidate user entries, clearing mirror");
            self.inner.users.invalidate_all();
        }
    }

    /// Apply one auth event.
    pub async fn apply(&self, change: AuthChange) {
        match change {
            AuthChange::SignedIn(session) | AuthChange::UserUpdated(session) => {
                self.sync(Some(&session)).await;
            }
            AuthChange::SignedOut { access_token } => self.forget(&access_token).await,
            AuthChange::TokenRefreshed {
                previous_access_token,
                session,
            } => {
                self.forget(&previous_access_token).await;
                self.sync(Some(&session)).await;
            }
            AuthChange::RoleChanged { user_id } => self.forget_user(user_id),
        }
    }

    /// Keep the mirror in step with auth events until the sender is dropped.
    #[must_use]
    pub fn spawn_listener(&self, mut events: broadcast::Receiver<AuthChange>) -> JoinHandle<()> {
        let mirror = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(change) => mirror.apply(change).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth events lagged, clearing mirror");
                        mirror.inner.users.invalidate_all();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    #[cfg(test)]
    async fn cached(&self, access_token: &str) -> Option<CurrentUser> {
        self.inner.users.get(access_token).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::supabase::AuthUser;
    use crate::supabase::auth::UserMetadata;
    use quickmart_core::Role;

    /// A mirror pointed at a closed port: every lookup fails.
    fn offline_mirror(owner: Option<&str>) -> SessionMirror {
        let rest = RestClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/rest/v1".to_string(),
            SecretString::from("anon"),
        );
        SessionMirror::new(rest, owner.map(|e| Email::parse(e).unwrap()))
    }

    fn session(token: &str, email: &str) -> AuthSession {
        AuthSession {
            access_token: SecretString::from(token),
            refresh_token: SecretString::from("refresh"),
            expires_at: i64::MAX,
            user: AuthUser {
                id: UserId::new(uuid::Uuid::new_v4()),
                email: Some(email.to_string()),
                user_metadata: UserMetadata::default(),
            },
        }
    }

    #[tokio::test]
    async fn test_no_session_is_no_user() {
        assert!(offline_mirror(None).sync(None).await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back_to_policy() {
        let mirror = offline_mirror(Some("owner@quickmart.in"));

        let owner = mirror
            .sync(Some(&session("t-owner", "owner@quickmart.in")))
            .await
            .unwrap();
        assert_eq!(owner.role, Role::Owner);

        let shopper = mirror
            .sync(Some(&session("t-shopper", "shopper@quickmart.in")))
            .await
            .unwrap();
        assert_eq!(shopper.role, Role::Customer);
        assert_eq!(shopper.name, "shopper");

        // Fallback results are not cached
        assert!(mirror.cached("t-shopper").await.is_none());
    }

    #[tokio::test]
    async fn test_listener_evicts_on_sign_out() {
        let mirror = offline_mirror(None);
        let user = CurrentUser {
            id: UserId::new(uuid::Uuid::new_v4()),
            email: None,
            name: "A".to_string(),
            role: Role::Admin,
        };
        mirror.inner.users.insert("t-1".to_string(), user.clone()).await;
        assert!(mirror.cached("t-1").await.is_some());

        mirror
            .apply(AuthChange::SignedOut {
                access_token: "t-1".to_string(),
            })
            .await;
        assert!(mirror.cached("t-1").await.is_none());
    }

    #[tokio::test]
    async fn test_role_change_evicts_every_token_of_user() {
        let mirror = offline_mirror(None);
        let user = CurrentUser {
            id: UserId::new(uuid::Uuid::new_v4()),
            email: None,
            name: "A".to_string(),
            role: Role::Admin,
        };
        mirror.inner.users.insert("t-1".to_string(), user.clone()).await;
        mirror.inner.users.insert("t-2".to_string(), user.clone()).await;

        mirror.apply(AuthChange::RoleChanged { user_id: user.id }).await;
        mirror.inner.users.run_pending_tasks().await;

        assert!(mirror.cached("t-1").await.is_none());
        assert!(mirror.cached("t-2").await.is_none());
    }
}
