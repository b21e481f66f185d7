//! Authentication service.
//!
//! Sign-in, sign-up and sign-out against the auth server, plus the
//! owner-only role management on top of the `profiles` table.

mod error;
pub mod mirror;

pub use error::AuthError;
pub use mirror::SessionMirror;

use quickmart_core::{CurrentUser, Email, Profile, Role, UserId};

use crate::db::ProfileRepository;
use crate::supabase::{AuthChange, AuthSession, SignUpOutcome, SupabaseClient, SupabaseError};

/// Authentication service.
pub struct AuthService<'a> {
    supabase: &'a SupabaseClient,
    mirror: &'a SessionMirror,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(supabase: &'a SupabaseClient, mirror: &'a SessionMirror) -> Self {
        Self { supabase, mirror }
    }

    /// Sign in with email and password.
    ///
    /// Returns the session to store and the resolved user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` with the server's message on
    /// failure.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthSession, CurrentUser), AuthError> {
        let email = Email::parse(email)?;
        require(password, "Password")?;

        let session = self
            .supabase
            .auth()
            .sign_in_with_password(email.as_str(), password)
            .await
            .map_err(|e| match e {
                SupabaseError::Api { message, .. } | SupabaseError::PermissionDenied(message) => {
                    AuthError::InvalidCredentials(message)
                }
                other => AuthError::Backend(other),
            })?;

        let user = self.resolve(&session).await?;
        Ok((session, user))
    }

    /// Create an account with a display name.
    ///
    /// When the server requires email confirmation no session is returned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SignUpRejected` with the server's message if the
    /// account cannot be created.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<(AuthSession, CurrentUser)>, AuthError> {
        let name = name.trim();
        require(name, "Name")?;
        let email = Email::parse(email)?;
        require(password, "Password")?;

        let outcome = self
            .supabase
            .auth()
            .sign_up(email.as_str(), password, name)
            .await
            .map_err(|e| match e {
                SupabaseError::Api { message, .. } => AuthError::SignUpRejected(message),
                other => AuthError::Backend(other),
            })?;

        match outcome {
            SignUpOutcome::SignedIn(session) => {
                let user = self.resolve(&session).await?;
                Ok(Some((session, user)))
            }
            SignUpOutcome::ConfirmationRequired(_) => Ok(None),
        }
    }

    /// End a session. Local state is cleared even if the server call fails.
    pub async fn sign_out(&self, session: &AuthSession) {
        if let Err(e) = self.supabase.auth().sign_out(session).await {
            tracing::warn!(error = %e, "Server-side sign out failed");
        }
    }

    /// Every profile, for the admin dashboard. Staff only; empty otherwise
    /// or on failure.
    pub async fn get_all_users(&self, actor: &CurrentUser, session: &AuthSession) -> Vec<Profile> {
        if !actor.is_staff() {
            tracing::warn!(user_id = %actor.id, "Non-staff user asked for all profiles");
            return Vec::new();
        }
        ProfileRepository::new(self.supabase.rest())
            .as_user(&session.access_token)
            .get_all_profiles()
            .await
    }

    /// Assign `admin` or `customer` to another user. Owner only.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` unless the actor is the owner,
    /// `AuthError::UnassignableRole` for `owner`, and
    /// `AuthError::OwnerImmutable` if the target is an owner (the actor
    /// included).
    pub async fn update_user_role(
        &self,
        actor: &CurrentUser,
        session: &AuthSession,
        target: UserId,
        role: Role,
    ) -> Result<Profile, AuthError> {
        check_role_assignment(actor, role)?;
        if target == actor.id {
            return Err(AuthError::OwnerImmutable);
        }

        let profiles = ProfileRepository::new(self.supabase.rest()).as_user(&session.access_token);
        let current = profiles
            .get_profile(target)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if current.role == Role::Owner {
            return Err(AuthError::OwnerImmutable);
        }

        let updated = profiles.update_role(target, role).await?;
        self.supabase
            .auth()
            .emit(AuthChange::RoleChanged { user_id: target });
        Ok(updated)
    }

    async fn resolve(&self, session: &AuthSession) -> Result<CurrentUser, AuthError> {
        self.mirror
            .sync(Some(session))
            .await
            .ok_or_else(|| AuthError::InvalidCredentials("Could not load your account".to_string()))
    }
}

/// Pre-flight checks for a role change that need no lookup.
fn check_role_assignment(actor: &CurrentUser, role: Role) -> Result<(), AuthError> {
    if !actor.role.can_assign_roles() {
        return Err(AuthError::Forbidden);
    }
    if role == Role::Owner {
        return Err(AuthError::UnassignableRole(role));
    }
    Ok(())
}

fn require(value: &str, field: &'static str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::MissingField(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(uuid::Uuid::new_v4()),
            email: None,
            name: "Tester".to_string(),
            role,
        }
    }

    #[test]
    fn test_only_owner_assigns_roles() {
        assert!(matches!(
            check_role_assignment(&user(Role::Admin), Role::Customer),
            Err(AuthError::Forbidden)
        ));
        assert!(matches!(
            check_role_assignment(&user(Role::Customer), Role::Admin),
            Err(AuthError::Forbidden)
        ));
        assert!(check_role_assignment(&user(Role::Owner), Role::Admin).is_ok());
        assert!(check_role_assignment(&user(Role::Owner), Role::Customer).is_ok());
    }

    #[test]
    fn test_owner_role_cannot_be_assigned() {
        assert!(matches!(
            check_role_assignment(&user(Role::Owner), Role::Owner),
            Err(AuthError::UnassignableRole(Role::Owner))
        ));
    }

    #[test]
    fn test_require_rejects_blank() {
        assert!(matches!(require("  ", "Name"), Err(AuthError::MissingField("Name"))));
        assert!(require("Asha", "Name").is_ok());
    }
}
