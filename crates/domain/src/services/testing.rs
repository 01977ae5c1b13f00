//! In-memory collaborators for service and router tests.
//!
//! [`InMemoryRepositories`] implements every repository trait over one shared
//! state, so a membership created through one trait is visible through the
//! others the way rows are in PostgreSQL.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    Apartment, ApartmentUpdate, Bill, BillType, Membership, NewApartment, NewBill, NewUser,
    Payment, PaymentHistoryEntry, PaymentStatus, ProfileUpdate, User, UserType,
};
use crate::ports::{
    ApartmentRepository, BillRepository, MembershipRepository, NotificationError, Notifier,
    PaymentRepository, RepoResult, RepositoryError, UserRepository,
};
use crate::store::{AtomicStore, StoreError};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, User>,
    apartments: BTreeMap<i64, Apartment>,
    memberships: BTreeMap<(i64, i64), Membership>,
    bills: BTreeMap<i64, Bill>,
    payments: BTreeMap<i64, Payment>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRepositories {
    state: Mutex<State>,
    fail_payment_updates: AtomicBool,
    failing_payment_inserts: Mutex<HashSet<i64>>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes `bulk_set_paid` fail with a backend error.
    pub fn fail_payment_updates(&self, fail: bool) {
        self.fail_payment_updates.store(fail, Ordering::SeqCst);
    }

    /// Makes `create_pending` fail for the given user.
    pub fn fail_payment_inserts_for(&self, user_id: i64) {
        self.failing_payment_inserts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(user_id);
    }

    pub fn add_user(&self, username: &str, user_type: UserType, telegram_user: Option<&str>) -> User {
        let mut state = self.state();
        let id = state.next_id();
        let user = User {
            id,
            username: username.to_string(),
            password_hash: String::new(),
            email: None,
            phone: None,
            full_name: None,
            user_type,
            telegram_user: telegram_user.map(str::to_string),
            telegram_chat_id: None,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        user
    }

    /// Creates an apartment managed by `manager_id`, including the manager membership.
    pub fn add_apartment(&self, manager_id: i64) -> Apartment {
        let mut state = self.state();
        insert_apartment(
            &mut state,
            NewApartment {
                apartment_name: "Test Apartment".to_string(),
                address: "1 Test Street".to_string(),
                units_count: 10,
                manager_id,
            },
        )
    }

    pub fn add_member(&self, user_id: i64, apartment_id: i64) {
        self.state().memberships.insert(
            (user_id, apartment_id),
            Membership {
                user_id,
                apartment_id,
                is_manager: false,
            },
        );
    }

    pub fn add_bill(&self, apartment_id: i64, bill_type: BillType, total_amount_cents: i64) -> Bill {
        let mut state = self.state();
        insert_bill(
            &mut state,
            apartment_id,
            NewBill {
                bill_type,
                total_amount_cents,
                due_date: NaiveDate::from_ymd_opt(2030, 1, 31).unwrap_or_default(),
                billing_deadline: None,
                description: Some(format!("{} bill", bill_type)),
            },
        )
    }

    pub fn add_payment(&self, bill_id: i64, user_id: i64, amount_cents: i64) -> Payment {
        let mut state = self.state();
        insert_payment(&mut state, bill_id, user_id, amount_cents)
    }

    pub fn payment(&self, payment_id: i64) -> Option<Payment> {
        self.state().payments.get(&payment_id).cloned()
    }

    pub fn payments_for_bill(&self, bill_id: i64) -> Vec<Payment> {
        self.state()
            .payments
            .values()
            .filter(|p| p.bill_id == bill_id)
            .cloned()
            .collect()
    }

    pub fn membership(&self, user_id: i64, apartment_id: i64) -> Option<Membership> {
        self.state().memberships.get(&(user_id, apartment_id)).copied()
    }

    pub fn membership_count(&self, apartment_id: i64) -> usize {
        self.state()
            .memberships
            .values()
            .filter(|m| m.apartment_id == apartment_id)
            .count()
    }

    pub fn user(&self, user_id: i64) -> Option<User> {
        self.state().users.get(&user_id).cloned()
    }

    pub fn apartment(&self, apartment_id: i64) -> Option<Apartment> {
        self.state().apartments.get(&apartment_id).cloned()
    }

    pub fn bill(&self, bill_id: i64) -> Option<Bill> {
        self.state().bills.get(&bill_id).cloned()
    }

    pub fn set_chat_id(&self, user_id: i64, chat_id: i64) {
        if let Some(user) = self.state().users.get_mut(&user_id) {
            user.telegram_chat_id = Some(chat_id);
        }
    }
}

fn insert_apartment(state: &mut State, new: NewApartment) -> Apartment {
    let id = state.next_id();
    let apartment = Apartment {
        id,
        apartment_name: new.apartment_name,
        address: new.address,
        units_count: new.units_count,
        manager_id: new.manager_id,
        created_at: Utc::now(),
    };
    state.apartments.insert(id, apartment.clone());
    state.memberships.insert(
        (new.manager_id, id),
        Membership {
            user_id: new.manager_id,
            apartment_id: id,
            is_manager: true,
        },
    );
    apartment
}

fn insert_bill(state: &mut State, apartment_id: i64, new: NewBill) -> Bill {
    let id = state.next_id();
    let bill = Bill {
        id,
        apartment_id,
        bill_type: new.bill_type,
        total_amount_cents: new.total_amount_cents,
        due_date: new.due_date,
        billing_deadline: new.billing_deadline,
        description: new.description,
        created_at: Utc::now(),
    };
    state.bills.insert(id, bill.clone());
    bill
}

fn insert_payment(state: &mut State, bill_id: i64, user_id: i64, amount_cents: i64) -> Payment {
    let id = state.next_id();
    let payment = Payment {
        id,
        bill_id,
        user_id,
        amount_cents,
        status: PaymentStatus::Pending,
        paid_at: None,
        created_at: Utc::now(),
    };
    state.payments.insert(id, payment.clone());
    payment
}

#[async_trait]
impl UserRepository for InMemoryRepositories {
    async fn resolve_by_handle(&self, handle: &str) -> RepoResult<Option<User>> {
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.telegram_user.as_deref() == Some(handle))
            .cloned())
    }

    async fn find_by_id(&self, user_id: i64) -> RepoResult<Option<User>> {
        Ok(self.state().users.get(&user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> RepoResult<User> {
        let mut state = self.state();
        let taken = state.users.values().any(|u| {
            u.username == new.username
                || (new.telegram_user.is_some() && u.telegram_user == new.telegram_user)
        });
        if taken {
            return Err(RepositoryError::Conflict("users_username_key".to_string()));
        }

        let id = state.next_id();
        let user = User {
            id,
            username: new.username,
            password_hash: new.password_hash,
            email: new.email,
            phone: new.phone,
            full_name: new.full_name,
            user_type: new.user_type,
            telegram_user: new.telegram_user,
            telegram_chat_id: None,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn set_telegram_chat_id(&self, handle: &str, chat_id: i64) -> RepoResult<bool> {
        let mut state = self.state();
        match state
            .users
            .values_mut()
            .find(|u| u.telegram_user.as_deref() == Some(handle))
        {
            Some(user) => {
                user.telegram_chat_id = Some(chat_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_all(&self) -> RepoResult<Vec<User>> {
        Ok(self.state().users.values().cloned().collect())
    }

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> RepoResult<Option<User>> {
        let mut state = self.state();
        let taken = state.users.values().any(|u| {
            u.id != user_id
                && (update.username.as_ref() == Some(&u.username)
                    || matches!(&update.telegram_user, Some(Some(h)) if u.telegram_user.as_ref() == Some(h)))
        });
        if taken {
            return Err(RepositoryError::Conflict("users_username_key".to_string()));
        }

        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = Some(email);
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(full_name) = update.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(handle) = update.telegram_user {
            if handle != user.telegram_user {
                user.telegram_chat_id = None;
            }
            user.telegram_user = handle;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, user_id: i64) -> RepoResult<bool> {
        let mut state = self.state();
        if state.apartments.values().any(|a| a.manager_id == user_id) {
            return Err(RepositoryError::Conflict("apartments_manager_id_fkey".to_string()));
        }
        if state.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        state.memberships.retain(|(member, _), _| *member != user_id);
        state.payments.retain(|_, p| p.user_id != user_id);
        Ok(true)
    }
}

#[async_trait]
impl MembershipRepository for InMemoryRepositories {
    async fn is_manager(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool> {
        Ok(self
            .state()
            .memberships
            .get(&(user_id, apartment_id))
            .is_some_and(|m| m.is_manager))
    }

    async fn is_member(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool> {
        Ok(self.state().memberships.contains_key(&(user_id, apartment_id)))
    }

    async fn create_membership(
        &self,
        user_id: i64,
        apartment_id: i64,
        is_manager: bool,
    ) -> RepoResult<Membership> {
        let mut state = self.state();
        if state.memberships.contains_key(&(user_id, apartment_id)) {
            return Err(RepositoryError::Conflict("user_apartments_pkey".to_string()));
        }
        let membership = Membership {
            user_id,
            apartment_id,
            is_manager,
        };
        state.memberships.insert((user_id, apartment_id), membership);
        Ok(membership)
    }

    async fn delete_membership(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool> {
        Ok(self
            .state()
            .memberships
            .remove(&(user_id, apartment_id))
            .is_some())
    }

    async fn residents_of(&self, apartment_id: i64) -> RepoResult<Vec<User>> {
        let state = self.state();
        Ok(state
            .memberships
            .values()
            .filter(|m| m.apartment_id == apartment_id)
            .filter_map(|m| state.users.get(&m.user_id).cloned())
            .map(|user| (user.id, user))
            .collect::<BTreeMap<i64, User>>()
            .into_values()
            .collect())
    }
}

#[async_trait]
impl ApartmentRepository for InMemoryRepositories {
    async fn create(&self, apartment: NewApartment) -> RepoResult<Apartment> {
        let mut state = self.state();
        Ok(insert_apartment(&mut state, apartment))
    }

    async fn find_by_id(&self, apartment_id: i64) -> RepoResult<Option<Apartment>> {
        Ok(self.state().apartments.get(&apartment_id).cloned())
    }

    async fn list_for_member(&self, user_id: i64) -> RepoResult<Vec<Apartment>> {
        let state = self.state();
        Ok(state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| state.apartments.get(&m.apartment_id).cloned())
            .collect())
    }

    async fn update(&self, apartment_id: i64, update: ApartmentUpdate) -> RepoResult<Option<Apartment>> {
        let mut state = self.state();
        Ok(state.apartments.get_mut(&apartment_id).map(|apartment| {
            apartment.apartment_name = update.apartment_name;
            apartment.address = update.address;
            apartment.units_count = update.units_count;
            apartment.clone()
        }))
    }

    async fn delete(&self, apartment_id: i64) -> RepoResult<bool> {
        let mut state = self.state();
        if state.apartments.remove(&apartment_id).is_none() {
            return Ok(false);
        }
        state.memberships.retain(|(_, apartment), _| *apartment != apartment_id);
        let bill_ids: HashSet<i64> = state
            .bills
            .values()
            .filter(|b| b.apartment_id == apartment_id)
            .map(|b| b.id)
            .collect();
        state.bills.retain(|id, _| !bill_ids.contains(id));
        state.payments.retain(|_, p| !bill_ids.contains(&p.bill_id));
        Ok(true)
    }
}

#[async_trait]
impl BillRepository for InMemoryRepositories {
    async fn create(&self, apartment_id: i64, bill: NewBill) -> RepoResult<Bill> {
        let mut state = self.state();
        if !state.apartments.contains_key(&apartment_id) {
            return Err(RepositoryError::NotFound("apartment".to_string()));
        }
        Ok(insert_bill(&mut state, apartment_id, bill))
    }

    async fn find_by_id(&self, bill_id: i64) -> RepoResult<Option<Bill>> {
        Ok(self.state().bills.get(&bill_id).cloned())
    }

    async fn get_undivided_bills(
        &self,
        apartment_id: i64,
        bill_type: Option<BillType>,
    ) -> RepoResult<Vec<Bill>> {
        let state = self.state();
        Ok(state
            .bills
            .values()
            .filter(|b| b.apartment_id == apartment_id)
            .filter(|b| bill_type.map_or(true, |t| b.bill_type == t))
            .filter(|b| !state.payments.values().any(|p| p.bill_id == b.id))
            .cloned()
            .collect())
    }

    async fn list_for_apartment(&self, apartment_id: i64) -> RepoResult<Vec<Bill>> {
        let mut bills: Vec<Bill> = self
            .state()
            .bills
            .values()
            .filter(|b| b.apartment_id == apartment_id)
            .cloned()
            .collect();
        bills.sort_by(|a, b| b.due_date.cmp(&a.due_date).then(b.id.cmp(&a.id)));
        Ok(bills)
    }

    async fn update_undivided(&self, bill_id: i64, bill: NewBill) -> RepoResult<Option<Bill>> {
        let mut state = self.state();
        if state.payments.values().any(|p| p.bill_id == bill_id) {
            return Ok(None);
        }
        Ok(state.bills.get_mut(&bill_id).map(|stored| {
            stored.bill_type = bill.bill_type;
            stored.total_amount_cents = bill.total_amount_cents;
            stored.due_date = bill.due_date;
            stored.billing_deadline = bill.billing_deadline;
            stored.description = bill.description;
            stored.clone()
        }))
    }

    async fn delete_unless_paid(&self, bill_id: i64) -> RepoResult<Option<bool>> {
        let mut state = self.state();
        if !state.bills.contains_key(&bill_id) {
            return Ok(None);
        }
        let paid = state
            .payments
            .values()
            .any(|p| p.bill_id == bill_id && p.status == PaymentStatus::Paid);
        if paid {
            return Ok(Some(false));
        }
        state.bills.remove(&bill_id);
        state.payments.retain(|_, p| p.bill_id != bill_id);
        Ok(Some(true))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryRepositories {
    async fn get_pending(&self, user_id: i64) -> RepoResult<Vec<Payment>> {
        Ok(self
            .state()
            .payments
            .values()
            .filter(|p| p.user_id == user_id && p.status == PaymentStatus::Pending)
            .cloned()
            .collect())
    }

    async fn exists_for(&self, bill_id: i64, user_id: i64) -> RepoResult<bool> {
        Ok(self
            .state()
            .payments
            .values()
            .any(|p| p.bill_id == bill_id && p.user_id == user_id))
    }

    async fn find_by_bill_and_user(&self, bill_id: i64, user_id: i64) -> RepoResult<Option<Payment>> {
        Ok(self
            .state()
            .payments
            .values()
            .find(|p| p.bill_id == bill_id && p.user_id == user_id)
            .cloned())
    }

    async fn history_for_user(&self, user_id: i64) -> RepoResult<Vec<PaymentHistoryEntry>> {
        let state = self.state();
        Ok(state
            .payments
            .values()
            .rev()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                let bill = state.bills.get(&p.bill_id)?;
                let apartment = state.apartments.get(&bill.apartment_id)?;
                Some(PaymentHistoryEntry {
                    payment: p.clone(),
                    bill: bill.clone(),
                    apartment_name: apartment.apartment_name.clone(),
                })
            })
            .collect())
    }

    async fn create_pending(
        &self,
        bill_id: i64,
        user_id: i64,
        amount_cents: i64,
    ) -> RepoResult<Option<Payment>> {
        let failing = self
            .failing_payment_inserts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&user_id);
        if failing {
            return Err(RepositoryError::Backend("insert rejected".to_string()));
        }

        let mut state = self.state();
        if state
            .payments
            .values()
            .any(|p| p.bill_id == bill_id && p.user_id == user_id)
        {
            return Ok(None);
        }
        Ok(Some(insert_payment(&mut state, bill_id, user_id, amount_cents)))
    }

    async fn bulk_set_paid(
        &self,
        user_id: i64,
        payment_ids: &[i64],
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Vec<i64>> {
        if self.fail_payment_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("update rejected".to_string()));
        }

        let mut state = self.state();
        let mut updated = Vec::new();
        for id in payment_ids {
            if let Some(payment) = state.payments.get_mut(id) {
                if payment.user_id == user_id && payment.status == PaymentStatus::Pending {
                    payment.status = PaymentStatus::Paid;
                    payment.paid_at = Some(paid_at);
                    updated.push(*id);
                }
            }
        }
        updated.sort_unstable();
        Ok(updated)
    }
}

/// Store whose every call fails, for outage paths.
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl AtomicStore for UnavailableStore {
    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn set_if_absent(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// A message captured by [`MockNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    Invitation { handle: String, invite_url: String },
    BillNotice { user_id: i64, bill_id: i64, amount_cents: i64 },
    Message { user_id: i64, text: String },
}

/// Recording notifier for tests.
#[derive(Debug, Default)]
pub struct MockNotifier {
    /// Whether every send fails with `NotificationError::Delivery`.
    pub simulate_failure: bool,
    sent: Mutex<Vec<SentNotification>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Messages delivered so far. Failed sends are not recorded.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    fn record(&self, notification: SentNotification) -> Result<(), NotificationError> {
        if self.simulate_failure {
            return Err(NotificationError::Delivery("simulated failure".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification);
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_invitation(
        &self,
        invite_url: &str,
        _apartment_id: i64,
        handle: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        self.record(SentNotification::Invitation {
            handle: handle.to_string(),
            invite_url: invite_url.to_string(),
        })
    }

    async fn send_bill_notice(
        &self,
        user_id: i64,
        bill: &Bill,
        amount_cents: i64,
    ) -> Result<(), NotificationError> {
        self.record(SentNotification::BillNotice {
            user_id,
            bill_id: bill.id,
            amount_cents,
        })
    }

    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), NotificationError> {
        self.record(SentNotification::Message {
            user_id,
            text: text.to_string(),
        })
    }
}
