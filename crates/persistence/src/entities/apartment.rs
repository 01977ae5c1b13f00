//! Apartment and membership entities.

use chrono::{DateTime, Utc};
use domain::models::{Apartment, Membership};
use sqlx::FromRow;

/// Database row mapping for the apartments table.
#[derive(Debug, Clone, FromRow)]
pub struct ApartmentEntity {
    pub id: i64,
    pub apartment_name: String,
    pub address: String,
    pub units_count: i32,
    pub manager_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ApartmentEntity> for Apartment {
    fn from(entity: ApartmentEntity) -> Self {
        Self {
            id: entity.id,
            apartment_name: entity.apartment_name,
            address: entity.address,
            units_count: entity.units_count,
            manager_id: entity.manager_id,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the user_apartments table.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct MembershipEntity {
    pub user_id: i64,
    pub apartment_id: i64,
    pub is_manager: bool,
}

impl From<MembershipEntity> for Membership {
    fn from(entity: MembershipEntity) -> Self {
        Self {
            user_id: entity.user_id,
            apartment_id: entity.apartment_id,
            is_manager: entity.is_manager,
        }
    }
}
