//! HTTP route handlers.

pub mod apartments;
pub mod bills;
pub mod health;
pub mod invitations;
pub mod payments;
pub mod users;

use serde::Deserialize;

/// `?id=` query used by the apartment and bill CRUD endpoints.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i64,
}
