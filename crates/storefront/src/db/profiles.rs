//! Profile repository.
//!
//! A profile row carries the display name and role for an auth user.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quickmart_core::{Profile, Role, UserId};

use super::RepositoryError;
use crate::supabase::RestClient;

const TABLE: &str = "profiles";

/// A row of the `profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = match row.role.as_deref() {
            None => Role::Customer,
            Some(raw) => raw.parse::<Role>().map_err(|e| {
                RepositoryError::DataCorruption(format!("profile {}: {e}", row.id))
            })?,
        };

        Ok(Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
struct ProfileInsert<'a> {
    id: UserId,
    name: &'a str,
    role: Role,
}

#[derive(Debug, Serialize)]
struct RoleUpdate {
    role: Role,
}

/// Repository for user profiles.
pub struct ProfileRepository<'a> {
    rest: &'a RestClient,
    token: Option<&'a SecretString>,
}

impl<'a> ProfileRepository<'a> {
    /// Create a repository that reads anonymously.
    #[must_use]
    pub const fn new(rest: &'a RestClient) -> Self {
        Self { rest, token: None }
    }

    /// Act as the signed-in user.
    #[must_use]
    pub const fn as_user(mut self, token: &'a SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Look up the profile for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the request fails or the stored role is unknown.
    #[instrument(skip(self))]
    pub async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> = self
            .rest
            .table(TABLE)
            .select("*")
            .eq("id", id)
            .with_token(self.token)
            .fetch_optional()
            .await?;
        row.map(Profile::try_from).transpose()
    }

    /// Insert a profile row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the profile already exists.
    #[instrument(skip(self, profile), fields(user_id = %profile.id))]
    pub async fn create_profile(&self, profile: &Profile) -> Result<Profile, RepositoryError> {
        let row: ProfileRow = self
            .rest
            .table(TABLE)
            .with_token(self.token)
            .insert(&ProfileInsert {
                id: profile.id,
                name: &profile.name,
                role: profile.role,
            })
            .await?;
        tracing::info!("Profile created");
        Profile::try_from(row)
    }

    /// All profiles, newest first. Empty if the read fails.
    pub async fn get_all_profiles(&self) -> Vec<Profile> {
        let result: Result<Vec<ProfileRow>, _> = self
            .rest
            .table(TABLE)
            .select("*")
            .order("created_at", false)
            .with_token(self.token)
            .fetch()
            .await;

        match result {
            Ok(rows) => collect_profiles(rows),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load profiles");
                Vec::new()
            }
        }
    }

    /// Profiles for the given ids. Empty if the read fails.
    pub async fn get_profiles_by_ids(&self, ids: &[UserId]) -> Vec<Profile> {
        if ids.is_empty() {
            return Vec::new();
        }

        let result: Result<Vec<ProfileRow>, _> = self
            .rest
            .table(TABLE)
            .select("id,name,role,created_at")
            .in_list("id", ids)
            .with_token(self.token)
            .fetch()
            .await;

        match result {
            Ok(rows) => collect_profiles(rows),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load profile names");
                Vec::new()
            }
        }
    }

    /// Set a user's role and return the updated profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no profile.
    #[instrument(skip(self))]
    pub async fn update_role(&self, id: UserId, role: Role) -> Result<Profile, RepositoryError> {
        let row: ProfileRow = self
            .rest
            .table(TABLE)
            .eq("id", id)
            .with_token(self.token)
            .update(&RoleUpdate { role })
            .await?;
        tracing::info!(role = %role, "Role updated");
        Profile::try_from(row)
    }
}

/// Map rows, skipping (and logging) any with an unknown role.
fn collect_profiles(rows: Vec<ProfileRow>) -> Vec<Profile> {
    rows.into_iter()
        .filter_map(|row| {
            Profile::try_from(row)
                .inspect_err(|e| tracing::warn!(error = %e, "Skipping profile"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER_ID: &str = "0b7f3c1e-5d2a-4c8e-9f61-2a4b6c8d0e1f";

    #[test]
    fn test_row_maps_role() {
        let row: ProfileRow = serde_json::from_value(serde_json::json!({
            "id": USER_ID,
            "name": "Asha",
            "role": "admin",
            "created_at": "2026-10-17T09:30:00Z"
        }))
        .unwrap();

        let profile = Profile::try_from(row).unwrap();
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.name, "Asha");
    }

    #[test]
    fn test_missing_role_defaults_to_customer() {
        let row: ProfileRow =
            serde_json::from_value(serde_json::json!({ "id": USER_ID })).unwrap();
        let profile = Profile::try_from(row).unwrap();
        assert_eq!(profile.role, Role::Customer);
        assert_eq!(profile.name, "");
    }

    #[test]
    fn test_unknown_role_is_data_corruption() {
        let row: ProfileRow = serde_json::from_value(serde_json::json!({
            "id": USER_ID, "name": "X", "role": "superuser"
        }))
        .unwrap();
        assert!(matches!(
            Profile::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_collect_profiles_skips_bad_rows() {
        let rows: Vec<ProfileRow> = serde_json::from_value(serde_json::json!([
            { "id": USER_ID, "name": "A", "role": "customer" },
            { "id": "1b7f3c1e-5d2a-4c8e-9f61-2a4b6c8d0e1f", "name": "B", "role": "root" }
        ]))
        .unwrap();
        assert_eq!(collect_profiles(rows).len(), 1);
    }
}
