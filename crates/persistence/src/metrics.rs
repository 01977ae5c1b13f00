//! Query latency and pool gauges.
//!
//! Latency goes to `database_query_duration_seconds{query, outcome}`. Pool
//! gauges are sampled whenever `/metrics` is scraped.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

const COMPLETED: &str = "completed";
const ABORTED: &str = "aborted";

/// Samples pool occupancy into the `database_pool_*` gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_pool_connections", "state" => "active").set(size.saturating_sub(idle) as f64);
    gauge!("database_pool_connections", "state" => "idle").set(idle as f64);
    gauge!("database_pool_size").set(size as f64);
}

/// Times one repository query.
///
/// `record()` reports the query as completed. A timer dropped without
/// `record()`, typically because a `?` returned early inside a
/// transaction, reports it as aborted.
///
/// ```ignore
/// let timer = QueryTimer::new("get_pending_payments");
/// let result = sqlx::query_as::<_, PaymentEntity>(...).fetch_all(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query: &'static str,
    start: Instant,
    outcome: &'static str,
}

impl QueryTimer {
    pub fn new(query: &'static str) -> Self {
        Self {
            query,
            start: Instant::now(),
            outcome: ABORTED,
        }
    }

    pub fn record(mut self) {
        self.outcome = COMPLETED;
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        histogram!(
            "database_query_duration_seconds",
            "query" => self.query,
            "outcome" => self.outcome
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timer_defaults_to_aborted() {
        let timer = QueryTimer::new("bulk_set_paid");
        assert_eq!(timer.query, "bulk_set_paid");
        assert_eq!(timer.outcome, ABORTED);
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        // No global recorder is installed in unit tests.
        QueryTimer::new("create_bill").record();
        drop(QueryTimer::new("find_bill_by_id"));
    }
}
