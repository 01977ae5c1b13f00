//! Shared utilities for the apartment manager backend.
//!
//! - Capability codes for invitations
//! - Access tokens (HS256 JWT)
//! - Password hashing with Argon2id
//! - Integer-cent money math
//! - Field validation and hashing helpers

pub mod capability;
pub mod crypto;
pub mod jwt;
pub mod money;
pub mod password;
pub mod validation;
