//! Bill endpoints: creation, division and resident views.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use shared::money::cents_to_decimal;

use domain::models::{
    BillResponse, BillType, BillWithPayment, CreateBillRequest, DivisionSummary,
    PaymentHistoryItem, PaymentResponse, UpdateBillRequest,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ManagerAuth, UserAuth};
use crate::routes::apartments::DeletedResponse;
use crate::routes::IdQuery;

#[derive(Debug, Serialize)]
pub struct UnpaidPaymentsResponse {
    pub payments: Vec<PaymentResponse>,
    pub total_amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct ApartmentQuery {
    pub apartment_id: i64,
}

#[derive(Debug, Serialize)]
pub struct BillListResponse {
    pub apartment_id: i64,
    pub bills: Vec<BillResponse>,
}

#[derive(Debug, Serialize)]
pub struct PaymentHistoryResponse {
    pub payments: Vec<PaymentHistoryItem>,
}

/// Create a bill for an apartment.
///
/// POST /api/v1/manager/bill/:apartment_id/create
pub async fn create_bill(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Path(apartment_id): Path<i64>,
    Json(request): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    request.validate()?;

    let bill = state
        .bills
        .create_bill(manager.user_id, apartment_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(BillResponse::from(bill))))
}

/// A bill of an apartment the caller manages.
///
/// GET /api/v1/manager/bill?id=
pub async fn get_bill(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Query(query): Query<IdQuery>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = state.bills.bill(manager.user_id, query.id).await?;
    Ok(Json(BillResponse::from(bill)))
}

/// Replace a bill that has not been divided yet.
///
/// PUT /api/v1/manager/bill?id=
pub async fn update_bill(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Query(query): Query<IdQuery>,
    Json(request): Json<UpdateBillRequest>,
) -> Result<Json<BillResponse>, ApiError> {
    request.validate()?;

    let bill = state
        .bills
        .update_bill(manager.user_id, query.id, request)
        .await?;
    Ok(Json(BillResponse::from(bill)))
}

/// DELETE /api/v1/manager/bill?id=
pub async fn delete_bill(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Query(query): Query<IdQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.bills.delete_bill(manager.user_id, query.id).await?;

    Ok(Json(DeletedResponse {
        id: query.id,
        message: format!("Bill {} deleted", query.id),
    }))
}

/// GET /api/v1/manager/bills/get-all?apartment_id=
pub async fn list_bills(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Query(query): Query<ApartmentQuery>,
) -> Result<Json<BillListResponse>, ApiError> {
    let bills = state
        .bills
        .bills_for_apartment(manager.user_id, query.apartment_id)
        .await?;

    Ok(Json(BillListResponse {
        apartment_id: query.apartment_id,
        bills: bills.into_iter().map(BillResponse::from).collect(),
    }))
}

/// Divide undivided bills of one type among residents.
///
/// POST /api/v1/manager/bills/:apartment_id/divide/:bill_type
pub async fn divide_by_type(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Path((apartment_id, bill_type)): Path<(i64, String)>,
) -> Result<Json<DivisionSummary>, ApiError> {
    let bill_type = BillType::from_str(&bill_type).map_err(ApiError::Validation)?;

    let summary = state
        .payments
        .divide_bill_by_type(manager.user_id, apartment_id, bill_type)
        .await?;
    Ok(Json(summary))
}

/// Divide every undivided bill of an apartment.
///
/// POST /api/v1/manager/bills/:apartment_id/divide-all
pub async fn divide_all(
    State(state): State<AppState>,
    ManagerAuth(manager): ManagerAuth,
    Path(apartment_id): Path<i64>,
) -> Result<Json<DivisionSummary>, ApiError> {
    let summary = state
        .payments
        .divide_all_bills(manager.user_id, apartment_id)
        .await?;
    Ok(Json(summary))
}

/// Pending payments of the caller.
///
/// GET /api/v1/resident/bills/unpaid
pub async fn unpaid(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<UnpaidPaymentsResponse>, ApiError> {
    let pending = state.bills.unpaid_payments(user.user_id).await?;
    let total_cents: i64 = pending.iter().map(|p| p.amount_cents).sum();

    Ok(Json(UnpaidPaymentsResponse {
        payments: pending.into_iter().map(PaymentResponse::from).collect(),
        total_amount: cents_to_decimal(total_cents),
    }))
}

/// A bill together with the caller's share of it.
///
/// GET /api/v1/resident/bill/:bill_id
pub async fn bill_details(
    State(state): State<AppState>,
    user: UserAuth,
    Path(bill_id): Path<i64>,
) -> Result<Json<BillWithPayment>, ApiError> {
    let bill = state
        .bills
        .bill_with_payment_status(user.user_id, bill_id)
        .await?;
    Ok(Json(bill))
}

/// Every payment of the caller, newest first.
///
/// GET /api/v1/resident/bills/payment-history
pub async fn payment_history(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<PaymentHistoryResponse>, ApiError> {
    let payments = state.bills.payment_history(user.user_id).await?;
    Ok(Json(PaymentHistoryResponse { payments }))
}
