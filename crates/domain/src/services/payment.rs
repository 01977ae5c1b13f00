//! Payment orchestration: idempotent pay workflows and bill division.
//!
//! Every relational payment update happens strictly after the idempotency
//! gate has granted first use, so a replayed request with the same key never
//! transitions a payment twice.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{error, info, warn};

use shared::money::{cents_to_decimal, split_cents};

use crate::error::DomainError;
use crate::models::{BatchPaymentOutcome, Bill, BillType, DivisionSummary, PaymentOutcome, User};
use crate::ports::{BillRepository, MembershipRepository, Notifier, PaymentRepository};
use crate::services::idempotency::{GateOutcome, IdempotencyGate};

pub const BATCH_PAYMENT_STATUS: &str = "batch payment successful";

#[derive(Clone)]
pub struct PaymentService {
    gate: IdempotencyGate,
    payments: Arc<dyn PaymentRepository>,
    bills: Arc<dyn BillRepository>,
    memberships: Arc<dyn MembershipRepository>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentService {
    pub fn new(
        gate: IdempotencyGate,
        payments: Arc<dyn PaymentRepository>,
        bills: Arc<dyn BillRepository>,
        memberships: Arc<dyn MembershipRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gate,
            payments,
            bills,
            memberships,
            notifier,
        }
    }

    /// Pays the listed payments of `user_id` under one idempotency key.
    ///
    /// Ids already processed under the key are skipped. A marker stays only for
    /// a payment this call actually moved to paid: ids that are not the
    /// caller's pending payments are released and reported as rejected, and a
    /// failed status write releases every marker this call reserved.
    pub async fn pay_bills(
        &self,
        user_id: i64,
        payment_ids: &[i64],
        idempotency_key: &str,
    ) -> Result<PaymentOutcome, DomainError> {
        if payment_ids.is_empty() {
            return Err(DomainError::Validation(
                "payment_ids must not be empty".to_string(),
            ));
        }
        if idempotency_key.trim().is_empty() {
            return Err(DomainError::Validation(
                "idempotency key must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut reserved = Vec::new();
        let mut outcome = PaymentOutcome::default();

        for &payment_id in payment_ids.iter().filter(|id| seen.insert(**id)) {
            match self.gate.check_and_mark(payment_id, idempotency_key).await {
                Ok(GateOutcome::FirstUse) => reserved.push(payment_id),
                Ok(GateOutcome::AlreadyProcessed) => outcome.skipped_ids.push(payment_id),
                Err(e) => {
                    self.release_markers(&reserved, idempotency_key).await;
                    return Err(e);
                }
            }
        }

        counter!("payments_skipped_total").increment(outcome.skipped_ids.len() as u64);

        if reserved.is_empty() {
            info!(
                user_id = user_id,
                skipped = outcome.skipped_ids.len(),
                "All payments already processed for idempotency key"
            );
            return Ok(outcome);
        }

        let updated = match self.payments.bulk_set_paid(user_id, &reserved, Utc::now()).await {
            Ok(updated) => updated,
            Err(e) => {
                error!(user_id = user_id, error = %e, "Failed to mark payments paid");
                self.release_markers(&reserved, idempotency_key).await;
                return Err(DomainError::repository("marking payments paid", e));
            }
        };

        let transitioned: HashSet<i64> = updated.iter().copied().collect();
        let (processed, rejected): (Vec<i64>, Vec<i64>) =
            reserved.into_iter().partition(|id| transitioned.contains(id));
        if !rejected.is_empty() {
            warn!(
                user_id = user_id,
                rejected = ?rejected,
                "Payments not owned by user or not pending"
            );
            self.release_markers(&rejected, idempotency_key).await;
        }

        outcome.updated_count = processed.len() as u64;
        outcome.processed_ids = processed;
        outcome.rejected_ids = rejected;

        counter!("payments_processed_total").increment(outcome.updated_count);
        info!(
            user_id = user_id,
            processed = outcome.processed_ids.len(),
            skipped = outcome.skipped_ids.len(),
            rejected = outcome.rejected_ids.len(),
            "Payments processed"
        );

        Ok(outcome)
    }

    /// Pays one payment. An id that is not the caller's pending payment is
    /// `NotFound`; a replay under the same key is reported as skipped.
    pub async fn pay_bill(
        &self,
        user_id: i64,
        payment_id: i64,
        idempotency_key: &str,
    ) -> Result<PaymentOutcome, DomainError> {
        let outcome = self.pay_bills(user_id, &[payment_id], idempotency_key).await?;
        if !outcome.rejected_ids.is_empty() {
            return Err(DomainError::NotFound("Payment".to_string()));
        }
        Ok(outcome)
    }

    /// Pays every pending payment of `user_id`.
    ///
    /// The total covers the payments this call moved to paid, priced from the
    /// pending rows read at the start of the call.
    pub async fn pay_batch_bills(
        &self,
        user_id: i64,
        idempotency_key: &str,
    ) -> Result<BatchPaymentOutcome, DomainError> {
        let pending = self
            .payments
            .get_pending(user_id)
            .await
            .map_err(|e| DomainError::repository("loading pending payments", e))?;
        if pending.is_empty() {
            return Err(DomainError::NoPendingPayments);
        }

        let ids: Vec<i64> = pending.iter().map(|p| p.id).collect();
        let outcome = self.pay_bills(user_id, &ids, idempotency_key).await?;

        let processed: HashSet<i64> = outcome.processed_ids.iter().copied().collect();
        let total_amount_cents: i64 = pending
            .iter()
            .filter(|p| processed.contains(&p.id))
            .map(|p| p.amount_cents)
            .sum();

        Ok(BatchPaymentOutcome {
            total_amount_cents,
            total_amount: cents_to_decimal(total_amount_cents),
            status: BATCH_PAYMENT_STATUS,
            processed_ids: outcome.processed_ids,
            skipped_ids: outcome.skipped_ids,
        })
    }

    /// Divides undivided bills of one type among the apartment's residents.
    pub async fn divide_bill_by_type(
        &self,
        manager_id: i64,
        apartment_id: i64,
        bill_type: BillType,
    ) -> Result<DivisionSummary, DomainError> {
        let mut summary = self.divide(manager_id, apartment_id, Some(bill_type)).await?;
        summary.bill_type = Some(bill_type);
        // Single-type division reports no per-type breakdown.
        summary.bill_types_processed.clear();
        Ok(summary)
    }

    /// Divides every undivided bill of the apartment.
    pub async fn divide_all_bills(
        &self,
        manager_id: i64,
        apartment_id: i64,
    ) -> Result<DivisionSummary, DomainError> {
        self.divide(manager_id, apartment_id, None).await
    }

    async fn divide(
        &self,
        manager_id: i64,
        apartment_id: i64,
        bill_type: Option<BillType>,
    ) -> Result<DivisionSummary, DomainError> {
        let is_manager = self
            .memberships
            .is_manager(manager_id, apartment_id)
            .await
            .map_err(|e| DomainError::repository("verifying manager status", e))?;
        if !is_manager {
            warn!(
                user_id = manager_id,
                apartment_id = apartment_id,
                "Non-manager attempted to divide bills"
            );
            return Err(DomainError::NotAuthorized);
        }

        let mut residents = self
            .memberships
            .residents_of(apartment_id)
            .await
            .map_err(|e| DomainError::repository("loading residents", e))?;
        if residents.is_empty() {
            return Err(DomainError::NoResidents);
        }
        residents.sort_by_key(|r| r.id);

        let bills = self
            .bills
            .get_undivided_bills(apartment_id, bill_type)
            .await
            .map_err(|e| DomainError::repository("loading undivided bills", e))?;

        let mut summary = DivisionSummary {
            residents_count: residents.len(),
            ..DivisionSummary::default()
        };
        let mut per_type: BTreeMap<BillType, usize> = BTreeMap::new();

        for bill in &bills {
            let failed = self.divide_one(bill, &residents).await;
            if failed == 0 {
                summary.processed_bills.push(bill.id);
                *per_type.entry(bill.bill_type).or_default() += 1;
            } else {
                summary.failed_bills.push(bill.id);
                summary.failed_payments_count += failed;
            }
        }

        summary.processed_count = summary.processed_bills.len();
        summary.bill_types_processed = per_type;
        if !summary.failed_bills.is_empty() {
            summary.warning = Some(format!(
                "Failed to process {} bills completely",
                summary.failed_bills.len()
            ));
        }

        info!(
            user_id = manager_id,
            apartment_id = apartment_id,
            processed_count = summary.processed_count,
            failed_count = summary.failed_bills.len(),
            "Bill division completed"
        );

        Ok(summary)
    }

    /// Frees markers that did not lead to a transition. A marker that cannot be
    /// freed stays set.
    async fn release_markers(&self, payment_ids: &[i64], idempotency_key: &str) {
        for &payment_id in payment_ids {
            if let Err(e) = self.gate.release(payment_id, idempotency_key).await {
                error!(payment_id = payment_id, error = %e, "Failed to release idempotency marker");
            }
        }
    }

    /// Creates the missing pending rows for one bill. Returns failed inserts.
    async fn divide_one(&self, bill: &Bill, residents: &[User]) -> usize {
        let shares = split_cents(bill.total_amount_cents, residents.len());
        let mut failed = 0;

        for (resident, share) in residents.iter().zip(shares) {
            match self.payments.exists_for(bill.id, resident.id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    error!(bill_id = bill.id, resident_id = resident.id, error = %e, "Failed to check payment record");
                    failed += 1;
                    continue;
                }
            }

            match self.payments.create_pending(bill.id, resident.id, share).await {
                Ok(Some(_)) => {
                    if let Err(e) = self.notifier.send_bill_notice(resident.id, bill, share).await {
                        warn!(bill_id = bill.id, resident_id = resident.id, error = %e, "Failed to send bill notification");
                        counter!("notifications_failed_total", "kind" => "bill").increment(1);
                    }
                }
                // A concurrent division inserted the row first.
                Ok(None) => {}
                Err(e) => {
                    error!(bill_id = bill.id, resident_id = resident.id, error = %e, "Failed to create payment record");
                    failed += 1;
                }
            }
        }

        failed
    }
}
