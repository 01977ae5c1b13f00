//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod apartment;
pub mod bill;
pub mod payment;
pub mod user;

pub use apartment::{ApartmentEntity, MembershipEntity};
pub use bill::{BillEntity, BillTypeDb};
pub use payment::{PaymentEntity, PaymentHistoryRow, PaymentStatusDb};
pub use user::{UserEntity, UserTypeDb};
