//! Bill creation and resident-side bill queries.

use std::sync::Arc;

use tracing::{info, warn};

use shared::money::{cents_to_decimal, decimal_to_cents};
use shared::validation::parse_date;

use crate::error::DomainError;
use crate::models::{
    Bill, BillResponse, BillWithPayment, CreateBillRequest, NewBill, Payment, PaymentHistoryItem,
    UpdateBillRequest,
};
use crate::ports::{BillRepository, MembershipRepository, PaymentRepository};

#[derive(Clone)]
pub struct BillService {
    bills: Arc<dyn BillRepository>,
    payments: Arc<dyn PaymentRepository>,
    memberships: Arc<dyn MembershipRepository>,
}

impl BillService {
    pub fn new(
        bills: Arc<dyn BillRepository>,
        payments: Arc<dyn PaymentRepository>,
        memberships: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            bills,
            payments,
            memberships,
        }
    }

    async fn ensure_manager(
        &self,
        user_id: i64,
        apartment_id: i64,
        action: &'static str,
    ) -> Result<(), DomainError> {
        let is_manager = self
            .memberships
            .is_manager(user_id, apartment_id)
            .await
            .map_err(|e| DomainError::repository("verifying manager status", e))?;
        if !is_manager {
            warn!(user_id = user_id, apartment_id = apartment_id, action = action, "Non-manager rejected");
            return Err(DomainError::NotAuthorized);
        }
        Ok(())
    }

    /// Loads a bill and checks that `manager_id` manages its apartment.
    async fn managed_bill(
        &self,
        manager_id: i64,
        bill_id: i64,
        action: &'static str,
    ) -> Result<Bill, DomainError> {
        let bill = self
            .bills
            .find_by_id(bill_id)
            .await
            .map_err(|e| DomainError::repository("loading bill", e))?
            .ok_or_else(|| DomainError::NotFound("Bill".to_string()))?;
        self.ensure_manager(manager_id, bill.apartment_id, action).await?;
        Ok(bill)
    }

    /// Creates a bill for an apartment. Manager only.
    pub async fn create_bill(
        &self,
        manager_id: i64,
        apartment_id: i64,
        request: CreateBillRequest,
    ) -> Result<Bill, DomainError> {
        self.ensure_manager(manager_id, apartment_id, "create bill").await?;

        let bill = self
            .bills
            .create(apartment_id, new_bill(request)?)
            .await
            .map_err(|e| DomainError::repository("creating bill", e))?;

        info!(
            user_id = manager_id,
            apartment_id = apartment_id,
            bill_id = bill.id,
            bill_type = %bill.bill_type,
            "Bill created"
        );
        Ok(bill)
    }

    /// A bill of an apartment the caller manages.
    pub async fn bill(&self, manager_id: i64, bill_id: i64) -> Result<Bill, DomainError> {
        self.managed_bill(manager_id, bill_id, "view bill").await
    }

    /// Every bill of an apartment the caller manages.
    pub async fn bills_for_apartment(
        &self,
        manager_id: i64,
        apartment_id: i64,
    ) -> Result<Vec<Bill>, DomainError> {
        self.ensure_manager(manager_id, apartment_id, "list bills").await?;
        self.bills
            .list_for_apartment(apartment_id)
            .await
            .map_err(|e| DomainError::repository("listing bills", e))
    }

    /// Replaces a bill's fields. Divided bills are frozen.
    pub async fn update_bill(
        &self,
        manager_id: i64,
        bill_id: i64,
        request: UpdateBillRequest,
    ) -> Result<Bill, DomainError> {
        self.managed_bill(manager_id, bill_id, "update bill").await?;

        let bill = self
            .bills
            .update_undivided(bill_id, new_bill(request)?)
            .await
            .map_err(|e| DomainError::repository("updating bill", e))?
            .ok_or_else(|| DomainError::Conflict("bill has already been divided".to_string()))?;

        info!(user_id = manager_id, bill_id = bill_id, "Bill updated");
        Ok(bill)
    }

    /// Deletes a bill and its payments. Refused once any share is paid.
    pub async fn delete_bill(&self, manager_id: i64, bill_id: i64) -> Result<(), DomainError> {
        self.managed_bill(manager_id, bill_id, "delete bill").await?;

        match self
            .bills
            .delete_unless_paid(bill_id)
            .await
            .map_err(|e| DomainError::repository("deleting bill", e))?
        {
            Some(true) => {
                info!(user_id = manager_id, bill_id = bill_id, "Bill deleted");
                Ok(())
            }
            Some(false) => Err(DomainError::Conflict(
                "bill has paid payments and cannot be deleted".to_string(),
            )),
            None => Err(DomainError::NotFound("Bill".to_string())),
        }
    }

    /// Every payment of the user with its bill, newest first.
    pub async fn payment_history(&self, user_id: i64) -> Result<Vec<PaymentHistoryItem>, DomainError> {
        let entries = self
            .payments
            .history_for_user(user_id)
            .await
            .map_err(|e| DomainError::repository("loading payment history", e))?;
        Ok(entries.into_iter().map(PaymentHistoryItem::from).collect())
    }

    /// Pending payments of the user.
    pub async fn unpaid_payments(&self, user_id: i64) -> Result<Vec<Payment>, DomainError> {
        self.payments
            .get_pending(user_id)
            .await
            .map_err(|e| DomainError::repository("loading pending payments", e))
    }

    /// A bill of one of the user's apartments with the user's share.
    pub async fn bill_with_payment_status(
        &self,
        user_id: i64,
        bill_id: i64,
    ) -> Result<BillWithPayment, DomainError> {
        let bill = self
            .bills
            .find_by_id(bill_id)
            .await
            .map_err(|e| DomainError::repository("loading bill", e))?
            .ok_or_else(|| DomainError::NotFound("Bill".to_string()))?;

        let is_member = self
            .memberships
            .is_member(user_id, bill.apartment_id)
            .await
            .map_err(|e| DomainError::repository("checking membership", e))?;
        if !is_member {
            return Err(DomainError::NotAuthorized);
        }

        let payment = self
            .payments
            .find_by_bill_and_user(bill_id, user_id)
            .await
            .map_err(|e| DomainError::repository("loading payment", e))?;

        Ok(BillWithPayment {
            bill: BillResponse::from(bill),
            payment_id: payment.as_ref().map(|p| p.id),
            share_amount: payment.as_ref().map(|p| cents_to_decimal(p.amount_cents)),
            payment_status: payment.as_ref().map(|p| p.status),
            paid_at: payment.and_then(|p| p.paid_at),
        })
    }
}

/// Converts a validated request into stored units.
fn new_bill(request: CreateBillRequest) -> Result<NewBill, DomainError> {
    let total_amount_cents = decimal_to_cents(request.total_amount)
        .filter(|cents| *cents > 0)
        .ok_or_else(|| DomainError::Validation("total_amount must be greater than zero".to_string()))?;
    let due_date = parse_date(&request.due_date)
        .ok_or_else(|| DomainError::Validation("due_date must use YYYY-MM-DD".to_string()))?;
    let billing_deadline = match request.billing_deadline.as_deref() {
        Some(raw) => Some(parse_date(raw).ok_or_else(|| {
            DomainError::Validation("billing_deadline must use YYYY-MM-DD".to_string())
        })?),
        None => None,
    };

    Ok(NewBill {
        bill_type: request.bill_type,
        total_amount_cents,
        due_date,
        billing_deadline,
        description: request.description,
    })
}
