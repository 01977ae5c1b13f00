//! Collaborator traits implemented by the persistence and API crates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Apartment, ApartmentUpdate, Bill, BillType, Membership, NewApartment, NewBill, NewUser,
    Payment, PaymentHistoryEntry, ProfileUpdate, User,
};

/// Error type for repository calls.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Error type for outbound notifications.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Recipient not found")]
    UnknownRecipient,

    #[error("Recipient has not started the bot yet")]
    NoChat,

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Looks a user up by Telegram handle (stored without `@`).
    async fn resolve_by_handle(&self, handle: &str) -> RepoResult<Option<User>>;

    async fn find_by_id(&self, user_id: i64) -> RepoResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    /// Inserts a user. A taken username or handle is `RepositoryError::Conflict`.
    async fn create(&self, user: NewUser) -> RepoResult<User>;

    /// Stores the chat id for a Telegram handle. Returns whether a user matched.
    async fn set_telegram_chat_id(&self, handle: &str, chat_id: i64) -> RepoResult<bool>;

    /// Every account, ordered by id.
    async fn list_all(&self) -> RepoResult<Vec<User>>;

    /// Applies a profile update. `None` when the user does not exist; a taken
    /// username or handle is `RepositoryError::Conflict`.
    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> RepoResult<Option<User>>;

    /// Deletes the user with their memberships and payments. A user who still
    /// manages an apartment is `RepositoryError::Conflict`.
    async fn delete(&self, user_id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn is_manager(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool>;

    async fn is_member(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool>;

    /// Inserts a membership. An existing row is `RepositoryError::Conflict`.
    async fn create_membership(
        &self,
        user_id: i64,
        apartment_id: i64,
        is_manager: bool,
    ) -> RepoResult<Membership>;

    /// Removes a membership. Returns whether a row was deleted.
    async fn delete_membership(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool>;

    /// All members of an apartment, manager included, ordered by user id.
    async fn residents_of(&self, apartment_id: i64) -> RepoResult<Vec<User>>;
}

#[async_trait]
pub trait ApartmentRepository: Send + Sync {
    /// Inserts the apartment and its manager membership in one transaction.
    async fn create(&self, apartment: NewApartment) -> RepoResult<Apartment>;

    async fn find_by_id(&self, apartment_id: i64) -> RepoResult<Option<Apartment>>;

    async fn list_for_member(&self, user_id: i64) -> RepoResult<Vec<Apartment>>;

    async fn update(&self, apartment_id: i64, update: ApartmentUpdate) -> RepoResult<Option<Apartment>>;

    /// Deletes the apartment together with its memberships, bills and payments.
    async fn delete(&self, apartment_id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait BillRepository: Send + Sync {
    async fn create(&self, apartment_id: i64, bill: NewBill) -> RepoResult<Bill>;

    async fn find_by_id(&self, bill_id: i64) -> RepoResult<Option<Bill>>;

    /// Bills of the apartment with no payment rows yet, oldest first.
    async fn get_undivided_bills(
        &self,
        apartment_id: i64,
        bill_type: Option<BillType>,
    ) -> RepoResult<Vec<Bill>>;

    /// All bills of the apartment, newest due date first.
    async fn list_for_apartment(&self, apartment_id: i64) -> RepoResult<Vec<Bill>>;

    /// Replaces the bill's fields. Only bills without payment rows change;
    /// `None` means no such undivided bill.
    async fn update_undivided(&self, bill_id: i64, bill: NewBill) -> RepoResult<Option<Bill>>;

    /// Deletes the bill and its payments unless any payment is paid.
    /// `None` when the bill does not exist, `Some(false)` when a paid payment blocks it.
    async fn delete_unless_paid(&self, bill_id: i64) -> RepoResult<Option<bool>>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Pending payments of a user, ordered by id.
    async fn get_pending(&self, user_id: i64) -> RepoResult<Vec<Payment>>;

    async fn exists_for(&self, bill_id: i64, user_id: i64) -> RepoResult<bool>;

    async fn find_by_bill_and_user(&self, bill_id: i64, user_id: i64) -> RepoResult<Option<Payment>>;

    /// All payments of a user with their bills, newest first.
    async fn history_for_user(&self, user_id: i64) -> RepoResult<Vec<PaymentHistoryEntry>>;

    /// Inserts a pending payment. `None` when a row for the pair already exists.
    async fn create_pending(
        &self,
        bill_id: i64,
        user_id: i64,
        amount_cents: i64,
    ) -> RepoResult<Option<Payment>>;

    /// Marks the user's pending payments among `payment_ids` as paid, atomically.
    /// Rows of other users or not pending are left unchanged. Returns the ids
    /// that moved to paid.
    async fn bulk_set_paid(
        &self,
        user_id: i64,
        payment_ids: &[i64],
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Vec<i64>>;
}

/// Outbound messages to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_invitation(
        &self,
        invite_url: &str,
        apartment_id: i64,
        handle: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotificationError>;

    async fn send_bill_notice(
        &self,
        user_id: i64,
        bill: &Bill,
        amount_cents: i64,
    ) -> Result<(), NotificationError>;

    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), NotificationError>;
}
