//! Redis-backed [`AtomicStore`] for invitations and idempotency markers.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};

use domain::store::{AtomicStore, StoreError};

/// Shared Redis connection. Cloning is cheap; the manager reconnects on failure.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Opens a connection manager for `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(url).map_err(unavailable)?;
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get Redis connection manager");
            unavailable(e)
        })?;
        tracing::info!("Connected to Redis");

        Ok(Self { manager })
    }
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

// PX keeps sub-second TTLs exact; Redis rejects a zero expiry.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl AtomicStore for RedisStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        // Nil reply means the key already existed.
        let reply: Option<String> = cmd.query_async(&mut conn).await.map_err(unavailable)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, u64>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_millis(250)), 250);
        assert_eq!(ttl_millis(Duration::from_secs(86_400)), 86_400_000);
    }

    fn redis_url() -> Option<String> {
        std::env::var("TEST_REDIS_URL").ok()
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (TEST_REDIS_URL)"]
    async fn test_set_if_absent_against_redis() {
        let Some(url) = redis_url() else { return };
        let store = RedisStore::connect(&url).await.unwrap();
        let key = format!("test:nx:{}", uuid::Uuid::new_v4());

        assert!(store.set_if_absent(&key, "processed", None).await.unwrap());
        assert!(!store.set_if_absent(&key, "processed", None).await.unwrap());
        assert_eq!(store.delete(&key).await.unwrap(), 1);
        assert_eq!(store.delete(&key).await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (TEST_REDIS_URL)"]
    async fn test_put_expires_against_redis() {
        let Some(url) = redis_url() else { return };
        let store = RedisStore::connect(&url).await.unwrap();
        let key = format!("test:ttl:{}", uuid::Uuid::new_v4());

        store.put(&key, "1", Duration::from_millis(100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(store.delete(&key).await.unwrap(), 0);
        store.ping().await.unwrap();
    }
}
