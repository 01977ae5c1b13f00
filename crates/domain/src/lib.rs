//! Domain layer for the apartment manager backend.
//!
//! This crate contains:
//! - Domain models (users, apartments, bills, payments, invitations)
//! - Collaborator traits and the atomic store abstraction
//! - Business logic services
//! - Domain error types

pub mod error;
pub mod models;
pub mod ports;
pub mod services;
pub mod store;

pub use error::DomainError;
