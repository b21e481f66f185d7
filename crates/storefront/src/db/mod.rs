//! Repositories over the hosted tables.
//!
//! # Tables
//!
//! - `products(id, name, price, category, emoji, created_at)`
//! - `profiles(id, name, role, created_at)`
//! - `orders(id, user_id, items jsonb, total, created_at)`
//!
//! Row-level security lives in the platform. Reads that feed a page degrade
//! to an empty list on failure (logged); writes return a `Result`.

pub mod orders;
pub mod products;
pub mod profiles;

pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use profiles::ProfileRepository;

use thiserror::Error;

use crate::supabase::SupabaseError;

/// Errors that can occur in repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(SupabaseError),

    /// A stored row could not be mapped to a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested row was not found.
    #[error("not found")]
    NotFound,

    /// Rejected by row-level security.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Constraint violation (e.g., duplicate profile).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<SupabaseError> for RepositoryError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::NotFound => Self::NotFound,
            SupabaseError::PermissionDenied(message) => Self::PermissionDenied(message),
            SupabaseError::Api {
                status: 409,
                message,
            } => Self::Conflict(message),
            other => Self::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supabase_errors_map_to_repository_errors() {
        assert!(matches!(
            RepositoryError::from(SupabaseError::NotFound),
            RepositoryError::NotFound
        ));
        assert!(matches!(
            RepositoryError::from(SupabaseError::PermissionDenied("rls".to_string())),
            RepositoryError::PermissionDenied(_)
        ));
        assert!(matches!(
            RepositoryError::from(SupabaseError::Api {
                status: 409,
                message: "duplicate key".to_string()
            }),
            RepositoryError::Conflict(_)
        ));
        assert!(matches!(
            RepositoryError::from(SupabaseError::RateLimited(3)),
            RepositoryError::Backend(SupabaseError::RateLimited(3))
        ));
    }
}
