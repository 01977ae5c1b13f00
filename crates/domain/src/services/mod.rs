//! Domain services for the apartment manager.
//!
//! Services contain business logic over the collaborator traits in
//! [`crate::ports`].

pub mod apartment;
pub mod bill;
pub mod idempotency;
pub mod invitation;
pub mod notification;
pub mod payment;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod user;

pub use apartment::ApartmentService;
pub use bill::BillService;
pub use idempotency::{GateOutcome, IdempotencyGate};
pub use invitation::{InvitationService, InvitationSettings, DEFAULT_INVITATION_TTL};
pub use notification::LogNotifier;
pub use payment::{PaymentService, BATCH_PAYMENT_STATUS};
pub use user::UserService;
