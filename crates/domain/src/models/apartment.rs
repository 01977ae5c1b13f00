//! Apartments and memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An apartment building managed by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Apartment {
    pub id: i64,
    pub apartment_name: String,
    pub address: String,
    pub units_count: i32,
    pub manager_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApartment {
    pub apartment_name: String,
    pub address: String,
    pub units_count: i32,
    pub manager_id: i64,
}

/// A `user_apartments` row. At most one exists per `(user_id, apartment_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: i64,
    pub apartment_id: i64,
    pub is_manager: bool,
}

/// Request body for `POST /manager/apartment`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateApartmentRequest {
    #[validate(length(min = 1, max = 128, message = "apartment_name must be 1-128 characters"))]
    pub apartment_name: String,

    #[validate(length(min = 1, max = 256, message = "address must be 1-256 characters"))]
    pub address: String,

    #[validate(range(min = 1, max = 10000, message = "units_count must be between 1 and 10000"))]
    pub units_count: i32,
}

/// Request body for `PUT /manager/apartment?id=`. Replaces every editable field.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateApartmentRequest {
    #[validate(length(min = 1, max = 128, message = "apartment_name must be 1-128 characters"))]
    pub apartment_name: String,

    #[validate(length(min = 1, max = 256, message = "address must be 1-256 characters"))]
    pub address: String,

    #[validate(range(min = 1, max = 10000, message = "units_count must be between 1 and 10000"))]
    pub units_count: i32,
}

/// Editable apartment fields. The manager never changes.
#[derive(Debug, Clone)]
pub struct ApartmentUpdate {
    pub apartment_name: String,
    pub address: String,
    pub units_count: i32,
}
