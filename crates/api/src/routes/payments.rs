//! Resident payment endpoints guarded by an `Idempotency-Key` header.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use validator::Validate;

use domain::models::{BatchPaymentOutcome, PayBillsRequest, PaymentOutcome};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{IdempotencyKey, UserAuth};

/// Mark the listed payments as paid.
///
/// POST /api/v1/resident/bills/pay
///
/// Replaying the same key skips ids it already processed.
pub async fn pay_bills(
    State(state): State<AppState>,
    user: UserAuth,
    IdempotencyKey(key): IdempotencyKey,
    Json(request): Json<PayBillsRequest>,
) -> Result<Json<PaymentOutcome>, ApiError> {
    request.validate()?;

    let outcome = state
        .payments
        .pay_bills(user.user_id, &request.payment_ids, &key)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct SinglePaymentResponse {
    pub payment_id: i64,
    pub status: &'static str,
}

/// Mark one payment as paid.
///
/// POST /api/v1/resident/bills/pay/:payment_id
pub async fn pay_bill(
    State(state): State<AppState>,
    user: UserAuth,
    IdempotencyKey(key): IdempotencyKey,
    Path(payment_id): Path<i64>,
) -> Result<Json<SinglePaymentResponse>, ApiError> {
    let outcome = state
        .payments
        .pay_bill(user.user_id, payment_id, &key)
        .await?;

    let status = if outcome.processed_ids.is_empty() {
        "already processed"
    } else {
        "payment successful"
    };
    Ok(Json(SinglePaymentResponse { payment_id, status }))
}

/// Pay every pending payment of the caller.
///
/// POST /api/v1/resident/bills/pay-batch
pub async fn pay_batch(
    State(state): State<AppState>,
    user: UserAuth,
    IdempotencyKey(key): IdempotencyKey,
) -> Result<Json<BatchPaymentOutcome>, ApiError> {
    let outcome = state.payments.pay_batch_bills(user.user_id, &key).await?;
    Ok(Json(outcome))
}
