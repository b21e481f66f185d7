//! Coarse authorization roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A role string that is not one of `owner`, `admin`, `customer`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Role of a signed-in user.
///
/// Stored lowercase in the `profiles.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Store owner. Can do everything, including assigning roles.
    Owner,
    /// Staff member with access to the admin dashboard.
    Admin,
    /// Regular shopper.
    #[default]
    Customer,
}

impl Role {
    /// Owner or admin: may open the admin dashboard and see every order.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// Only the owner may change other users' roles.
    #[must_use]
    pub const fn can_assign_roles(self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_and_assignment() {
        assert!(Role::Owner.is_staff());
        assert!(Role::Admin.is_staff());
        assert!(!Role::Customer.is_staff());
        assert!(Role::Owner.can_assign_roles());
        assert!(!Role::Admin.can_assign_roles());
    }

    #[test]
    fn test_parse_and_display() {
        for role in [Role::Owner, Role::Admin, Role::Customer] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(role, Role::Owner);
    }
}
