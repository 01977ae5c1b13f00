//! Account endpoints: sign up, log in, profiles and manager user admin.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use validator::Validate;

use domain::models::{
    LoginRequest, LoginResponse, ProfileResponse, PublicUserResponse, SignUpRequest,
    UpdateProfileRequest, UserResponse,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ManagerAuth, UserAuth};
use crate::routes::apartments::DeletedResponse;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<PublicUserResponse>,
}

/// Register a new resident or manager account.
///
/// POST /api/v1/user/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request.validate()?;

    let user = state.users.sign_up(request).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Exchange username and password for an access token.
///
/// POST /api/v1/user/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    request.validate()?;

    let response = state.users.log_in(request).await?;
    Ok(Json(response))
}

/// GET /api/v1/resident/profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.users.profile(user.user_id).await?;
    Ok(Json(profile))
}

/// Update the caller's own profile.
///
/// PUT /api/v1/resident/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    request.validate()?;

    let profile = state.users.update_profile(user.user_id, request).await?;
    Ok(Json(profile))
}

/// GET /api/v1/manager/user/get-all
pub async fn list_users(
    State(state): State<AppState>,
    ManagerAuth(_manager): ManagerAuth,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.users.list_users().await?;
    Ok(Json(UserListResponse { users }))
}

/// GET /api/v1/manager/user/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    ManagerAuth(_manager): ManagerAuth,
    Path(user_id): Path<i64>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    let user = state.users.public_user(user_id).await?;
    Ok(Json(user))
}

/// Delete an account with its memberships and payments.
///
/// DELETE /api/v1/manager/user/:user_id
pub async fn delete_user(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Path(user_id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.users.delete_user(manager.user_id, user_id).await?;

    Ok(Json(DeletedResponse {
        id: user_id,
        message: format!("User {} deleted", user_id),
    }))
}
