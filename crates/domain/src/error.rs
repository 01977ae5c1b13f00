//! Domain error taxonomy.
//!
//! Services return these kinds; the API crate alone decides how each kind maps
//! to an HTTP status.

use chrono::{DateTime, Utc};
use thiserror::Error;

use shared::capability::CodecError;

use crate::ports::RepositoryError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Only the apartment manager can perform this action")]
    NotAuthorized,

    #[error("User not found")]
    UserNotFound,

    #[error("User is already a member of this apartment")]
    AlreadyMember,

    #[error("Invalid or tampered code")]
    InvalidCode,

    #[error("Invitation not found or already used")]
    AlreadyConsumedOrExpired,

    #[error("Invitation was issued to a different user")]
    InviteeMismatch,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The invitation is live in the store; only the message to the invitee failed.
    #[error("Invitation created but notification failed: {reason}")]
    InvitationCreatedButNotificationFailed {
        invite_url: String,
        expires_at: DateTime<Utc>,
        reason: String,
    },

    #[error("No residents found in apartment")]
    NoResidents,

    #[error("No pending payments found")]
    NoPendingPayments,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Repository error while {context}: {message}")]
    Repository {
        context: &'static str,
        message: String,
    },
}

impl DomainError {
    /// Wraps a collaborator failure with the operation that was running.
    pub fn repository(context: &'static str, err: RepositoryError) -> Self {
        DomainError::Repository {
            context,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => DomainError::StoreUnavailable(message),
        }
    }
}

impl From<CodecError> for DomainError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidCode => DomainError::InvalidCode,
            other => DomainError::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_errors_map_to_kinds() {
        assert!(matches!(
            DomainError::from(CodecError::InvalidCode),
            DomainError::InvalidCode
        ));
        assert!(matches!(
            DomainError::from(CodecError::NegativeInput),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn test_store_error_maps_to_unavailable() {
        let err = DomainError::from(StoreError::Unavailable("connection refused".into()));
        assert!(matches!(err, DomainError::StoreUnavailable(ref m) if m == "connection refused"));
    }

    #[test]
    fn test_repository_context_in_message() {
        let err = DomainError::repository(
            "creating membership",
            RepositoryError::Backend("pool timed out".into()),
        );
        assert_eq!(
            err.to_string(),
            "Repository error while creating membership: Backend error: pool timed out"
        );
    }

    #[test]
    fn test_consumed_message_is_uniform() {
        assert_eq!(
            DomainError::AlreadyConsumedOrExpired.to_string(),
            "Invitation not found or already used"
        );
    }
}
