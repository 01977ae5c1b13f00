//! Domain models for the apartment manager.

pub mod apartment;
pub mod bill;
pub mod invitation;
pub mod payment;
pub mod user;

pub use apartment::{
    Apartment, ApartmentUpdate, CreateApartmentRequest, Membership, NewApartment,
    UpdateApartmentRequest,
};
pub use bill::{
    Bill, BillResponse, BillType, BillWithPayment, CreateBillRequest, NewBill, UpdateBillRequest,
};
pub use invitation::{Invitation, InviteePolicy, IssuedInvitation, JoinResponse};
pub use payment::{
    BatchPaymentOutcome, DivisionSummary, PayBillsRequest, Payment, PaymentHistoryEntry,
    PaymentHistoryItem, PaymentOutcome, PaymentResponse, PaymentStatus,
};
pub use user::{
    LoginRequest, LoginResponse, NewUser, ProfileResponse, ProfileUpdate, PublicUserResponse,
    SignUpRequest, UpdateProfileRequest, User, UserResponse, UserType,
};
