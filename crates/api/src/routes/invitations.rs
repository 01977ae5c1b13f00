//! Invitation issuance and redemption endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use domain::models::{IssuedInvitation, JoinResponse};
use domain::services::notification::joined_message;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ManagerAuth, UserAuth};

/// Invite the user behind a Telegram handle to an apartment.
///
/// POST /api/v1/manager/apartment/:apartment_id/invite/resident/:telegram_username
///
/// Answers 201 when the invitee was notified and 202 with the link when the
/// invitation exists but the Telegram message could not be delivered.
pub async fn create_invitation(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Path((apartment_id, telegram_username)): Path<(i64, String)>,
) -> Result<(StatusCode, Json<IssuedInvitation>), ApiError> {
    let issued = state
        .invitations
        .create_invitation(manager.user_id, apartment_id, &telegram_username)
        .await?;

    Ok((StatusCode::CREATED, Json(issued)))
}

/// Redeem an invitation code and join its apartment.
///
/// GET /api/v1/resident/apartment/invite/:invitation_code
pub async fn consume_invitation(
    State(state): State<AppState>,
    user: UserAuth,
    Path(invitation_code): Path<String>,
) -> Result<Json<JoinResponse>, ApiError> {
    let apartment_id = state
        .invitations
        .consume_invitation(user.user_id, &invitation_code)
        .await?;

    Ok(Json(JoinResponse {
        apartment_id,
        message: joined_message(apartment_id),
    }))
}
