//! Users, profiles and role resolution.
//!
//! A signed-in user is the combination of the auth session (who they are)
//! and an optional side profile row (display name and role). All role
//! decisions go through [`resolve_role`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::UserId;
use super::role::Role;

/// Fallback display name when neither metadata nor email gives one.
const ANONYMOUS_NAME: &str = "User";

/// The part of an auth session that identifies the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub email: Option<Email>,
    /// Display name supplied as sign-up metadata.
    pub metadata_name: Option<String>,
}

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Default profile provisioned on first sign-in: customer role,
    /// name from [`default_display_name`].
    #[must_use]
    pub fn provisional(identity: &SessionIdentity) -> Self {
        Self {
            id: identity.user_id,
            name: default_display_name(identity),
            role: Role::Customer,
            created_at: None,
        }
    }
}

/// The resolved, signed-in user as the views see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Option<Email>,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    /// Combine a session with its (optional) profile.
    #[must_use]
    pub fn resolve(
        identity: &SessionIdentity,
        profile: Option<&Profile>,
        owner_email: Option<&Email>,
    ) -> Self {
        let name = profile
            .filter(|p| p.id == identity.user_id && !p.name.trim().is_empty())
            .map_or_else(|| default_display_name(identity), |p| p.name.clone());

        Self {
            id: identity.user_id,
            email: identity.email.clone(),
            name,
            role: resolve_role(Some(identity), profile, owner_email),
        }
    }

    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// Display name: sign-up metadata, else the email local part, else `User`.
#[must_use]
pub fn default_display_name(identity: &SessionIdentity) -> String {
    identity
        .metadata_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| {
            identity
                .email
                .as_ref()
                .map(Email::local_part)
                .filter(|local| !local.is_empty())
        })
        .unwrap_or(ANONYMOUS_NAME)
        .to_string()
}

/// Resolve the role for a session.
///
/// Precedence:
/// 1. No session: `Customer` (the caller treats this as signed out).
/// 2. Session email equals the configured owner email: `Owner`, whatever
///    the profile says.
/// 3. A profile belonging to this session's user: its role.
/// 4. Otherwise `Customer`.
#[must_use]
pub fn resolve_role(
    session: Option<&SessionIdentity>,
    profile: Option<&Profile>,
    owner_email: Option<&Email>,
) -> Role {
    let Some(session) = session else {
        return Role::Customer;
    };

    if let (Some(owner), Some(email)) = (owner_email, session.email.as_ref())
        && owner == email
    {
        return Role::Owner;
    }

    profile
        .filter(|p| p.id == session.user_id)
        .map_or(Role::Customer, |p| p.role)
}
