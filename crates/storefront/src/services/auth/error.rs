//! Authentication error types.

use thiserror::Error;

use quickmart_core::Role;

use crate::db::RepositoryError;
use crate::supabase::SupabaseError;

/// Errors that can occur during authentication and role management.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] quickmart_core::EmailError),

    /// A required form field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Wrong email or password.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The auth server rejected a sign-up.
    #[error("{0}")]
    SignUpRejected(String),

    /// The caller's role does not allow this operation.
    #[error("not allowed")]
    Forbidden,

    /// Owners keep their role.
    #[error("the owner's role cannot be changed")]
    OwnerImmutable,

    /// Only `admin` and `customer` can be assigned.
    #[error("role {0} cannot be assigned")]
    UnassignableRole(Role),

    /// Target user has no profile.
    #[error("user not found")]
    UserNotFound,

    /// Auth server request failed.
    #[error("auth server error: {0}")]
    Backend(#[from] SupabaseError),

    /// Repository error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
