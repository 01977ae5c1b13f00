//! Bills issued to an apartment.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use shared::money::cents_to_decimal;
use shared::validation::validate_date;

use super::payment::PaymentStatus;

/// Bill category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillType {
    Water,
    Electricity,
    Gas,
    Maintenance,
    Other,
}

impl BillType {
    pub const ALL: [BillType; 5] = [
        BillType::Water,
        BillType::Electricity,
        BillType::Gas,
        BillType::Maintenance,
        BillType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BillType::Water => "water",
            BillType::Electricity => "electricity",
            BillType::Gas => "gas",
            BillType::Maintenance => "maintenance",
            BillType::Other => "other",
        }
    }
}

impl FromStr for BillType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "water" => Ok(BillType::Water),
            "electricity" => Ok(BillType::Electricity),
            "gas" => Ok(BillType::Gas),
            "maintenance" => Ok(BillType::Maintenance),
            "other" => Ok(BillType::Other),
            _ => Err(format!("Invalid bill type: {}", s)),
        }
    }
}

impl fmt::Display for BillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Bill {
    pub id: i64,
    pub apartment_id: i64,
    pub bill_type: BillType,
    pub total_amount_cents: i64,
    pub due_date: NaiveDate,
    pub billing_deadline: Option<NaiveDate>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub bill_type: BillType,
    pub total_amount_cents: i64,
    pub due_date: NaiveDate,
    pub billing_deadline: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Request body for `POST /manager/bill/:apartment_id/create`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateBillRequest {
    pub bill_type: BillType,

    #[validate(range(min = 0.01, message = "total_amount must be greater than zero"))]
    pub total_amount: f64,

    #[validate(custom(function = "validate_date"))]
    pub due_date: String,

    #[validate(custom(function = "validate_date"))]
    pub billing_deadline: Option<String>,

    #[validate(length(max = 512, message = "description must be at most 512 characters"))]
    pub description: Option<String>,
}

/// Request body for `PUT /manager/bill?id=`. Same fields as creation.
pub type UpdateBillRequest = CreateBillRequest;

/// Bill as rendered to clients, amounts in decimal units.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BillResponse {
    pub id: i64,
    pub apartment_id: i64,
    pub bill_type: BillType,
    pub total_amount: f64,
    pub due_date: NaiveDate,
    pub billing_deadline: Option<NaiveDate>,
    pub description: Option<String>,
}

impl From<Bill> for BillResponse {
    fn from(bill: Bill) -> Self {
        Self {
            id: bill.id,
            apartment_id: bill.apartment_id,
            bill_type: bill.bill_type,
            total_amount: cents_to_decimal(bill.total_amount_cents),
            due_date: bill.due_date,
            billing_deadline: bill.billing_deadline,
            description: bill.description,
        }
    }
}

/// A bill together with the caller's share and its status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BillWithPayment {
    pub bill: BillResponse,
    pub payment_id: Option<i64>,
    pub share_amount: Option<f64>,
    pub payment_status: Option<PaymentStatus>,
    pub paid_at: Option<DateTime<Utc>>,
}
