//! Per-resident payments and the outcomes of the payment workflows.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use shared::money::cents_to_decimal;

use super::bill::{Bill, BillResponse, BillType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One resident's share of one bill. Unique per `(bill_id, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Payment {
    pub id: i64,
    pub bill_id: i64,
    pub user_id: i64,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PaymentResponse {
    pub id: i64,
    pub bill_id: i64,
    pub amount: f64,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            bill_id: payment.bill_id,
            amount: cents_to_decimal(payment.amount_cents),
            status: payment.status,
            paid_at: payment.paid_at,
        }
    }
}

/// A payment joined with its bill and apartment name.
#[derive(Debug, Clone)]
pub struct PaymentHistoryEntry {
    pub payment: Payment,
    pub bill: Bill,
    pub apartment_name: String,
}

/// One row of `GET /resident/bills/payment-history`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PaymentHistoryItem {
    pub bill: BillResponse,
    pub payment: PaymentResponse,
    pub apartment_name: String,
}

impl From<PaymentHistoryEntry> for PaymentHistoryItem {
    fn from(entry: PaymentHistoryEntry) -> Self {
        Self {
            bill: BillResponse::from(entry.bill),
            payment: PaymentResponse::from(entry.payment),
            apartment_name: entry.apartment_name,
        }
    }
}

/// Request body for `POST /resident/bills/pay`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PayBillsRequest {
    #[validate(length(min = 1, max = 500, message = "payment_ids must contain 1-500 ids"))]
    pub payment_ids: Vec<i64>,
}

/// Result of `pay_bills`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    /// Ids this call moved from pending to paid.
    pub processed_ids: Vec<i64>,
    /// Ids already processed under the same key.
    pub skipped_ids: Vec<i64>,
    /// Ids that were not the caller's pending payments. Their markers are released.
    pub rejected_ids: Vec<i64>,
    pub updated_count: u64,
}

/// Result of `pay_batch_bills`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPaymentOutcome {
    pub total_amount_cents: i64,
    pub total_amount: f64,
    pub status: &'static str,
    pub processed_ids: Vec<i64>,
    pub skipped_ids: Vec<i64>,
}

/// Summary returned by the bill division workflows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DivisionSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<BillType>,
    pub residents_count: usize,
    pub processed_bills: Vec<i64>,
    pub processed_count: usize,
    pub failed_bills: Vec<i64>,
    pub failed_payments_count: usize,
    /// Number of divided bills per type. Empty for single-type division.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bill_types_processed: BTreeMap<BillType, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_type_counts_serialize_as_object() {
        let mut summary = DivisionSummary::default();
        summary.bill_types_processed.insert(BillType::Water, 2);
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["bill_types_processed"]["water"], 2);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(PaymentStatus::from_str("paid").unwrap(), PaymentStatus::Paid);
        assert!(PaymentStatus::from_str("PAID").is_err());
        assert_eq!(PaymentStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn test_pay_request_requires_ids() {
        assert!(PayBillsRequest { payment_ids: vec![] }.validate().is_err());
        assert!(PayBillsRequest { payment_ids: vec![7] }.validate().is_ok());
    }

    #[test]
    fn test_summary_omits_empty_optionals() {
        let json = serde_json::to_value(DivisionSummary::default()).unwrap();
        assert!(json.get("bill_type").is_none());
        assert!(json.get("warning").is_none());
        assert!(json.get("bill_types_processed").is_none());
        assert_eq!(json["processed_count"], 0);
    }
}
