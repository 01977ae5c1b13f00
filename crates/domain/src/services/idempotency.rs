//! First-use markers for `(payment id, idempotency key)` pairs.

use std::sync::Arc;

use tracing::{debug, warn};

use shared::crypto::sha256_hex;

use crate::error::DomainError;
use crate::store::AtomicStore;

const PROCESSED_MARKER: &str = "processed";

/// Result of reserving a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// This call created the marker and owns the work.
    FirstUse,
    /// The pair was already processed; the caller must skip it.
    AlreadyProcessed,
}

/// Idempotency gate over one atomic set-if-absent call per target.
#[derive(Clone)]
pub struct IdempotencyGate {
    store: Arc<dyn AtomicStore>,
}

impl IdempotencyGate {
    pub fn new(store: Arc<dyn AtomicStore>) -> Self {
        Self { store }
    }

    /// Store key `bill_payment:{target_id}:{sha256(key)}`.
    pub fn marker_key(target_id: i64, idempotency_key: &str) -> String {
        format!("bill_payment:{}:{}", target_id, sha256_hex(idempotency_key))
    }

    /// Reserves the marker for `(target_id, idempotency_key)`.
    ///
    /// Markers never expire. On a store failure nothing is marked.
    pub async fn check_and_mark(
        &self,
        target_id: i64,
        idempotency_key: &str,
    ) -> Result<GateOutcome, DomainError> {
        if idempotency_key.trim().is_empty() {
            return Err(DomainError::Validation(
                "idempotency key must not be empty".to_string(),
            ));
        }

        let created = self
            .store
            .set_if_absent(
                &Self::marker_key(target_id, idempotency_key),
                PROCESSED_MARKER,
                None,
            )
            .await?;

        if created {
            Ok(GateOutcome::FirstUse)
        } else {
            debug!(target_id = target_id, "Idempotency marker already present");
            Ok(GateOutcome::AlreadyProcessed)
        }
    }

    /// Removes a marker this caller reserved.
    pub async fn release(&self, target_id: i64, idempotency_key: &str) -> Result<(), DomainError> {
        let removed = self
            .store
            .delete(&Self::marker_key(target_id, idempotency_key))
            .await?;
        if removed == 0 {
            warn!(target_id = target_id, "Released idempotency marker was not present");
        }
        Ok(())
    }
}
