//! `GoTrue` auth client.
//!
//! Password sign-in, sign-up, token refresh and sign-out. Every change to a
//! session is published on a broadcast channel so listeners (the session
//! mirror) can keep derived state current.

use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::instrument;

use quickmart_core::{Email, SessionIdentity, UserId};

use super::rest::send_json;
use super::{SupabaseError, retry_after, truncate_body};

/// Seconds before expiry at which a token counts as expired.
const EXPIRY_LEEWAY_SECONDS: i64 = 30;

/// Capacity of the auth change channel.
const EVENT_CAPACITY: usize = 64;

// =============================================================================
// Types
// =============================================================================

/// User record returned by the auth server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Metadata supplied at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

impl AuthUser {
    /// The identity used for profile lookup and role resolution.
    #[must_use]
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            user_id: self.id,
            email: self.email.as_deref().and_then(|e| Email::parse(e).ok()),
            metadata_name: self.user_metadata.name.clone(),
        }
    }
}

/// A signed-in session: tokens plus the user they belong to.
///
/// Stored in the browser's server-side session. Implements `Debug` manually
/// to redact the tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(with = "secret_string")]
    pub access_token: SecretString,
    #[serde(with = "secret_string")]
    pub refresh_token: SecretString,
    /// Unix timestamp (seconds) at which the access token expires.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl AuthSession {
    /// Whether the access token has expired (or is about to) at `now`.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_LEEWAY_SECONDS <= now
    }

    /// Whether the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account is active and a session was issued.
    SignedIn(AuthSession),
    /// The account must be confirmed by email before signing in.
    ConfirmationRequired(AuthUser),
}

/// Session change published to listeners.
#[derive(Debug, Clone)]
pub enum AuthChange {
    /// A new session was created.
    SignedIn(AuthSession),
    /// A session ended; carries its access token.
    SignedOut { access_token: String },
    /// A session's access token was exchanged for a new one.
    TokenRefreshed {
        previous_access_token: String,
        session: AuthSession,
    },
    /// The user record behind a session changed.
    UserUpdated(AuthSession),
    /// A user's role was changed by an owner.
    RoleChanged { user_id: UserId },
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + token.expires_in);
        Self {
            access_token: SecretString::from(token.access_token),
            refresh_token: SecretString::from(token.refresh_token),
            expires_at,
            user: token.user,
        }
    }
}

/// Sign-up returns a session when confirmation is off, a bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpData<'a>,
}

#[derive(Serialize)]
struct SignUpData<'a> {
    name: &'a str,
}

// =============================================================================
// AuthClient
// =============================================================================

/// Client for the auth API of one project.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    events: broadcast::Sender<AuthChange>,
}

impl AuthClient {
    /// Create a new auth client.
    ///
    /// `base_url` is the auth root, e.g. `https://abc.supabase.co/auth/v1`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String, anon_key: SecretString) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(AuthClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                anon_key,
                events,
            }),
        }
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.inner.events.subscribe()
    }

    /// Publish a session change. Dropped silently when nobody listens.
    pub fn emit(&self, change: AuthChange) {
        let _ = self.inner.events.send(change);
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.inner
            .client
            .post(format!("{}/{path}", self.inner.base_url))
            .header("apikey", self.inner.anon_key.expose_secret())
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::Api` with the server's message on bad credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SupabaseError> {
        let request = self
            .post("token")
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        let token: TokenResponse = send_json(request).await?;
        let session = AuthSession::from(token);

        tracing::info!(user_id = %session.user.id, "Signed in");
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    /// Create an account. The display name is sent as user metadata.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::Api` if the server rejects the sign-up.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, SupabaseError> {
        let request = self.post("signup").json(&SignUpRequest {
            email,
            password,
            data: SignUpData { name },
        });
        let response: SignUpResponse = send_json(request).await?;

        match response {
            SignUpResponse::Session(token) => {
                let session = AuthSession::from(token);
                tracing::info!(user_id = %session.user.id, "Signed up");
                self.emit(AuthChange::SignedIn(session.clone()));
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Signed up, confirmation required");
                Ok(SignUpOutcome::ConfirmationRequired(user))
            }
        }
    }

    /// Exchange the refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the refresh token was revoked or has expired.
    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    pub async fn refresh_session(
        &self,
        session: &AuthSession,
    ) -> Result<AuthSession, SupabaseError> {
        let request = self
            .post("token")
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant {
                refresh_token: session.refresh_token.expose_secret(),
            });
        let token: TokenResponse = send_json(request).await?;
        let refreshed = AuthSession::from(token);

        tracing::debug!("Access token refreshed");
        self.emit(AuthChange::TokenRefreshed {
            previous_access_token: session.access_token.expose_secret().to_string(),
            session: refreshed.clone(),
        });
        Ok(refreshed)
    }

    /// Fetch the user behind an access token.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::PermissionDenied` if the token is invalid.
    #[instrument(skip(self, access_token))]
    pub async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, SupabaseError> {
        let request = self
            .inner
            .client
            .get(format!("{}/user", self.inner.base_url))
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(access_token.expose_secret());
        send_json(request).await
    }

    /// Revoke the session on the server.
    ///
    /// The `SignedOut` change is published even when the server call fails,
    /// so local state is always cleared.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the server rejected the logout.
    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    pub async fn sign_out(&self, session: &AuthSession) -> Result<(), SupabaseError> {
        let result = self.logout(&session.access_token).await;

        self.emit(AuthChange::SignedOut {
            access_token: session.access_token.expose_secret().to_string(),
        });
        tracing::info!("Signed out");
        result
    }

    async fn logout(&self, access_token: &SecretString) -> Result<(), SupabaseError> {
        let response = self
            .post("logout")
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SupabaseError::RateLimited(retry_after(&response)));
        }
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        tracing::warn!(status = %status, body = %truncate_body(&body), "Logout failed");
        Err(SupabaseError::from_status(status, &body))
    }
}

/// Serde helpers for storing a `SecretString` in the session store.
mod secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(secret.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER_ID: &str = "0b7f3c1e-5d2a-4c8e-9f61-2a4b6c8d0e1f";

    fn session_json() -> serde_json::Value {
        serde_json::json!({
            "access_token": "access-abc",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "refresh_token": "refresh-xyz",
            "user": {
                "id": USER_ID,
                "email": "mira@quickmart.in",
                "user_metadata": { "name": "Mira" }
            }
        })
    }

    #[test]
    fn test_token_response_into_session() {
        let token: TokenResponse = serde_json::from_value(session_json()).unwrap();
        let session = AuthSession::from(token);

        assert_eq!(session.expires_at, 1_900_000_000);
        assert_eq!(session.access_token.expose_secret(), "access-abc");
        assert_eq!(session.user.user_metadata.name.as_deref(), Some("Mira"));
    }

    #[test]
    fn test_sign_up_response_variants() {
        let with_session: SignUpResponse = serde_json::from_value(session_json()).unwrap();
        assert!(matches!(with_session, SignUpResponse::Session(_)));

        let user_only: SignUpResponse = serde_json::from_value(serde_json::json!({
            "id": USER_ID,
            "email": "mira@quickmart.in",
            "confirmation_sent_at": "2026-10-17T09:30:00Z"
        }))
        .unwrap();
        assert!(matches!(user_only, SignUpResponse::User(_)));
    }

    #[test]
    fn test_session_round_trips_through_session_store() {
        let token: TokenResponse = serde_json::from_value(session_json()).unwrap();
        let session = AuthSession::from(token);

        let stored = serde_json::to_value(&session).unwrap();
        let restored: AuthSession = serde_json::from_value(stored).unwrap();
        assert_eq!(restored.refresh_token.expose_secret(), "refresh-xyz");
        assert_eq!(restored.user, session.user);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let token: TokenResponse = serde_json::from_value(session_json()).unwrap();
        let debug_output = format!("{:?}", AuthSession::from(token));
        assert!(!debug_output.contains("access-abc"));
        assert!(!debug_output.contains("refresh-xyz"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_expiry_uses_leeway() {
        let token: TokenResponse = serde_json::from_value(session_json()).unwrap();
        let session = AuthSession::from(token);
        assert!(!session.is_expired_at(1_900_000_000 - 60));
        assert!(session.is_expired_at(1_900_000_000 - 10));
        assert!(session.is_expired_at(1_900_000_001));
    }

    #[test]
    fn test_identity_parses_email() {
        let user = AuthUser {
            id: USER_ID.parse().unwrap(),
            email: Some("Mira@QuickMart.in".to_string()),
            user_metadata: UserMetadata::default(),
        };
        let identity = user.identity();
        assert_eq!(identity.email.unwrap().as_str(), "mira@quickmart.in");

        let broken = AuthUser {
            email: Some("not-an-email".to_string()),
            ..user
        };
        assert!(broken.identity().email.is_none());
    }
}
