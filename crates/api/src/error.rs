use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use domain::DomainError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The invitation exists but the invitee was not told about it.
    #[error("Invitation created but notification failed: {reason}")]
    NotificationFailed {
        invite_url: String,
        expires_at: DateTime<Utc>,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

/// Body for an invitation whose notification failed.
#[derive(Debug, Serialize)]
struct PendingInvitationBody {
    invite_url: String,
    expires_at: DateTime<Utc>,
    warning: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::NotificationFailed {
                invite_url,
                expires_at,
                reason,
            } => {
                let body = PendingInvitationBody {
                    invite_url,
                    expires_at,
                    warning: format!("Invitation created but notification failed: {reason}"),
                };
                return (StatusCode::ACCEPTED, Json(body)).into_response();
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    "A backing service is unavailable. Please retry.".into(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::NotAuthorized | DomainError::InviteeMismatch => ApiError::Forbidden(message),
            DomainError::UserNotFound
            | DomainError::NotFound(_)
            | DomainError::AlreadyConsumedOrExpired => ApiError::NotFound(message),
            DomainError::AlreadyMember => ApiError::Conflict(message),
            DomainError::Conflict(detail) => ApiError::Conflict(detail),
            DomainError::Validation(detail) => ApiError::Validation(detail),
            DomainError::InvalidCode | DomainError::NoResidents | DomainError::NoPendingPayments => {
                ApiError::Validation(message)
            }
            DomainError::InvalidCredentials => ApiError::Unauthorized(message),
            DomainError::StoreUnavailable(detail) => ApiError::ServiceUnavailable(detail),
            DomainError::InvitationCreatedButNotificationFailed {
                invite_url,
                expires_at,
                reason,
            } => ApiError::NotificationFailed {
                invite_url,
                expires_at,
                reason,
            },
            DomainError::Repository { .. } => ApiError::Internal(message),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid")),
                })
            })
            .collect();

        let message = match details.as_slice() {
            [single] => single.message.clone(),
            many => format!("{} validation errors", many.len()),
        };

        ApiError::Validation(message)
    }
}
