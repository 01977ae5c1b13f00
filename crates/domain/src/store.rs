//! Atomic key-value store used for invitations and idempotency markers.
//!
//! The only ordering guarantee the services rely on is per-key
//! linearizability of `set_if_absent` and `delete`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Invitation;

const INVITATION_MARKER: &str = "1";

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AtomicStore: Send + Sync {
    /// Sets `key` with an expiry, overwriting any previous value.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Sets `key` only if it does not exist. `true` means this call created it.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    /// Deletes `key`, returning how many keys were removed.
    async fn delete(&self, key: &str) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// In-process store with lazy expiry. A single mutex serializes all keys.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a live key.
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Entry>, Instant) -> T,
    ) -> Result<T, StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(f(&mut entries, now))
    }
}

#[async_trait]
impl AtomicStore for MemoryStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.with_entries(|entries, now| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: Some(now + ttl),
                },
            );
        })
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        self.with_entries(|entries, now| {
            if entries.contains_key(key) {
                return false;
            }
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: ttl.map(|ttl| now + ttl),
                },
            );
            true
        })
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        self.with_entries(|entries, _| u64::from(entries.remove(key).is_some()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.with_entries(|_, _| ())
    }
}

/// Invitation keying on top of an [`AtomicStore`].
#[derive(Clone)]
pub struct InvitationStore {
    store: Arc<dyn AtomicStore>,
}

impl InvitationStore {
    pub fn new(store: Arc<dyn AtomicStore>) -> Self {
        Self { store }
    }

    /// Makes the invitation valid for `ttl`. Re-issuing resets the expiry.
    pub async fn issue(&self, invitation: &Invitation, ttl: Duration) -> Result<(), StoreError> {
        self.store
            .put(&invitation.store_key(), INVITATION_MARKER, ttl)
            .await
    }

    /// Burns the invitation. `false` means it was already consumed or has expired.
    pub async fn consume(&self, invitation: &Invitation) -> Result<bool, StoreError> {
        let deleted = self.store.delete(&invitation.store_key()).await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_if_absent_only_once() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("k", "processed", None).await.unwrap());
        assert!(!store.set_if_absent("k", "other", None).await.unwrap());
        assert_eq!(store.get("k").as_deref(), Some("processed"));
    }

    #[tokio::test]
    async fn test_delete_reports_count() {
        let store = MemoryStore::new();
        store.put("k", "1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.delete("k").await.unwrap(), 1);
        assert_eq!(store.delete("k").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_entries_are_absent() {
        let store = MemoryStore::new();
        store.put("short", "1", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.get("short"), None);
        assert_eq!(store.delete("short").await.unwrap(), 0);
        assert!(store.set_if_absent("short", "again", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_resets_ttl() {
        let store = MemoryStore::new();
        store.put("k", "1", Duration::from_millis(20)).await.unwrap();
        store.put("k", "1", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("k").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_invitation_issue_then_consume_once() {
        let backing = Arc::new(MemoryStore::new());
        let invitations = InvitationStore::new(backing.clone());
        let invitation = Invitation::new(9, 5, 1);

        invitations.issue(&invitation, Duration::from_secs(60)).await.unwrap();
        assert_eq!(backing.get("invitation:9:5:1").as_deref(), Some("1"));

        assert!(invitations.consume(&invitation).await.unwrap());
        assert!(!invitations.consume(&invitation).await.unwrap());
    }

    #[tokio::test]
    async fn test_never_issued_invitation_not_consumable() {
        let invitations = InvitationStore::new(Arc::new(MemoryStore::new()));
        assert!(!invitations.consume(&Invitation::new(1, 2, 3)).await.unwrap());
    }
}
