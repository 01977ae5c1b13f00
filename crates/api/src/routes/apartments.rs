//! Apartment endpoints for managers and residents.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use validator::Validate;

use domain::models::{Apartment, CreateApartmentRequest, UpdateApartmentRequest, UserResponse};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ManagerAuth, UserAuth};
use crate::routes::IdQuery;

/// Response for apartment listings.
#[derive(Debug, Serialize)]
pub struct ApartmentListResponse {
    pub apartments: Vec<Apartment>,
}

/// Response for resident listings.
#[derive(Debug, Serialize)]
pub struct ResidentListResponse {
    pub apartment_id: i64,
    pub residents: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub apartment_id: i64,
    pub message: String,
}

/// Create an apartment managed by the caller.
///
/// POST /api/v1/manager/apartment
pub async fn create_apartment(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Json(request): Json<CreateApartmentRequest>,
) -> Result<(StatusCode, Json<Apartment>), ApiError> {
    request.validate()?;

    let apartment = state
        .apartments
        .create_apartment(manager.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(apartment)))
}

/// An apartment the caller manages.
///
/// GET /api/v1/manager/apartment?id=
pub async fn get_apartment(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Query(query): Query<IdQuery>,
) -> Result<Json<Apartment>, ApiError> {
    let apartment = state.apartments.apartment(manager.user_id, query.id).await?;
    Ok(Json(apartment))
}

/// PUT /api/v1/manager/apartment?id=
pub async fn update_apartment(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Query(query): Query<IdQuery>,
    Json(request): Json<UpdateApartmentRequest>,
) -> Result<Json<Apartment>, ApiError> {
    request.validate()?;

    let apartment = state
        .apartments
        .update_apartment(manager.user_id, query.id, request)
        .await?;
    Ok(Json(apartment))
}

/// Delete an apartment with everything billed to it.
///
/// DELETE /api/v1/manager/apartment?id=
pub async fn delete_apartment(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Query(query): Query<IdQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state
        .apartments
        .delete_apartment(manager.user_id, query.id)
        .await?;

    Ok(Json(DeletedResponse {
        id: query.id,
        message: format!("Apartment {} deleted", query.id),
    }))
}

/// Apartments a given user belongs to.
///
/// GET /api/v1/manager/apartments/get-all/resident/:user_id
pub async fn apartments_of_user(
    State(state): State<AppState>,
    ManagerAuth(_manager): ManagerAuth,
    Path(user_id): Path<i64>,
) -> Result<Json<ApartmentListResponse>, ApiError> {
    let apartments = state.apartments.apartments_for_resident(user_id).await?;
    Ok(Json(ApartmentListResponse { apartments }))
}

/// List residents of an apartment the caller manages.
///
/// GET /api/v1/manager/apartment/:apartment_id/residents
pub async fn residents(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Path(apartment_id): Path<i64>,
) -> Result<Json<ResidentListResponse>, ApiError> {
    let residents = state
        .apartments
        .residents(manager.user_id, apartment_id)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(ResidentListResponse {
        apartment_id,
        residents,
    }))
}

/// Apartments the caller belongs to.
///
/// GET /api/v1/resident/apartments
pub async fn my_apartments(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<ApartmentListResponse>, ApiError> {
    let apartments = state.apartments.apartments_for_resident(user.user_id).await?;
    Ok(Json(ApartmentListResponse { apartments }))
}

/// Leave an apartment.
///
/// DELETE /api/v1/resident/apartment/:apartment_id
pub async fn leave_apartment(
    State(state): State<AppState>,
    user: UserAuth,
    Path(apartment_id): Path<i64>,
) -> Result<Json<LeaveResponse>, ApiError> {
    state
        .apartments
        .leave_apartment(user.user_id, apartment_id)
        .await?;

    Ok(Json(LeaveResponse {
        apartment_id,
        message: format!("You left apartment {}", apartment_id),
    }))
}
