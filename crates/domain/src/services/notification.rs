//! Notification texts and the log-only [`Notifier`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use shared::money::format_cents;

use crate::models::Bill;
use crate::ports::{NotificationError, Notifier};

/// Text of the invitation message sent to the invitee.
pub fn invitation_message(invite_url: &str, apartment_id: i64, expires_at: DateTime<Utc>) -> String {
    format!(
        "🏠 *New Apartment Invitation*\n\n\
         You've been invited to join apartment *{}*!\n\n\
         🔗 Accept Invitation: {}\n\n\
         ⏰ Expires: {}",
        apartment_id,
        invite_url,
        expires_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Text of the notice sent to each resident when a bill is divided.
pub fn bill_message(bill: &Bill, amount_cents: i64) -> String {
    format!(
        "*New Bill Notification*\n\n\
         Type: {}\n\
         Your Share: {}\n\
         Due Date: {}\n\
         Description: {}\n",
        bill.bill_type,
        format_cents(amount_cents),
        bill.due_date,
        bill.description.as_deref().unwrap_or("")
    )
}

pub fn joined_message(apartment_id: i64) -> String {
    format!("You joined apartment {}", apartment_id)
}

/// Notifier that only logs. Used when Telegram is disabled.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_invitation(
        &self,
        invite_url: &str,
        apartment_id: i64,
        handle: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        info!(
            handle = %handle,
            apartment_id = apartment_id,
            invite_url = %invite_url,
            expires_at = %expires_at,
            "Invitation notification (log only)"
        );
        Ok(())
    }

    async fn send_bill_notice(
        &self,
        user_id: i64,
        bill: &Bill,
        amount_cents: i64,
    ) -> Result<(), NotificationError> {
        info!(
            user_id = user_id,
            bill_id = bill.id,
            amount = %format_cents(amount_cents),
            "Bill notification (log only)"
        );
        Ok(())
    }

    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), NotificationError> {
        info!(user_id = user_id, text = %text, "Message notification (log only)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BillType;
    use chrono::{NaiveDate, TimeZone};

    fn bill() -> Bill {
        Bill {
            id: 3,
            apartment_id: 5,
            bill_type: BillType::Water,
            total_amount_cents: 10_000,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            billing_deadline: None,
            description: Some("April water".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_bill_message_layout() {
        let text = bill_message(&bill(), 5_000);
        assert!(text.contains("Type: water"));
        assert!(text.contains("Your Share: 50.00"));
        assert!(text.contains("Due Date: 2024-05-01"));
        assert!(text.contains("Description: April water"));
    }

    #[test]
    fn test_invitation_message_layout() {
        let expires = Utc.with_ymd_and_hms(2024, 5, 2, 10, 30, 0).unwrap();
        let text = invitation_message("http://host/invite/abc", 5, expires);
        assert!(text.contains("apartment *5*"));
        assert!(text.contains("http://host/invite/abc"));
        assert!(text.contains("2024-05-02 10:30:00"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = LogNotifier;
        assert!(notifier.send_message(1, "hi").await.is_ok());
        assert!(notifier.send_bill_notice(1, &bill(), 1).await.is_ok());
    }
}
