//! Bill entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{Bill, BillType};
use sqlx::FromRow;

/// Database enum for `bill_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "bill_type", rename_all = "lowercase")]
pub enum BillTypeDb {
    Water,
    Electricity,
    Gas,
    Maintenance,
    Other,
}

impl From<BillType> for BillTypeDb {
    fn from(value: BillType) -> Self {
        match value {
            BillType::Water => Self::Water,
            BillType::Electricity => Self::Electricity,
            BillType::Gas => Self::Gas,
            BillType::Maintenance => Self::Maintenance,
            BillType::Other => Self::Other,
        }
    }
}

impl From<BillTypeDb> for BillType {
    fn from(value: BillTypeDb) -> Self {
        match value {
            BillTypeDb::Water => Self::Water,
            BillTypeDb::Electricity => Self::Electricity,
            BillTypeDb::Gas => Self::Gas,
            BillTypeDb::Maintenance => Self::Maintenance,
            BillTypeDb::Other => Self::Other,
        }
    }
}

/// Database row mapping for the bills table.
#[derive(Debug, Clone, FromRow)]
pub struct BillEntity {
    pub id: i64,
    pub apartment_id: i64,
    pub bill_type: BillTypeDb,
    pub total_amount_cents: i64,
    pub due_date: NaiveDate,
    pub billing_deadline: Option<NaiveDate>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BillEntity> for Bill {
    fn from(entity: BillEntity) -> Self {
        Self {
            id: entity.id,
            apartment_id: entity.apartment_id,
            bill_type: entity.bill_type.into(),
            total_amount_cents: entity.total_amount_cents,
            due_date: entity.due_date,
            billing_deadline: entity.billing_deadline,
            description: entity.description,
            created_at: entity.created_at,
        }
    }
}
