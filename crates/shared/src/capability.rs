//! Reversible invitation codes.
//!
//! A capability code packs an `(invitee, apartment, inviter)` id triple into a
//! short alphanumeric Hashids string. The code is not a MAC. It only lets the
//! server recover the triple without a lookup table; whether the invitation is
//! still valid is decided by the store.
//!
//! Foreign or tampered strings are rejected at decode time: a code is accepted
//! only if it splits into exactly three numbers that re-encode to the very same
//! string.

use harsh::Harsh;
use thiserror::Error;

const TUPLE_ARITY: usize = 3;

/// Minimum code length used when configuration does not override it.
pub const DEFAULT_MIN_LENGTH: usize = 8;

/// Error type for capability code operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Capability salt must not be empty")]
    EmptySalt,

    #[error("Capability codec configuration rejected: {0}")]
    Build(String),

    #[error("Capability ids must be non-negative")]
    NegativeInput,

    #[error("Invalid or tampered code")]
    InvalidCode,
}

/// Salted encoder/decoder for invitation id triples.
#[derive(Clone)]
pub struct CapabilityCodec {
    hashids: Harsh,
    min_length: usize,
}

impl std::fmt::Debug for CapabilityCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityCodec")
            .field("min_length", &self.min_length)
            .field("salt", &"[REDACTED]")
            .finish()
    }
}

impl CapabilityCodec {
    /// Builds a codec for the given salt.
    ///
    /// The salt determines the shuffled alphabet, so codes produced under one
    /// salt never decode under another.
    pub fn new(salt: &str, min_length: usize) -> Result<Self, CodecError> {
        if salt.is_empty() {
            return Err(CodecError::EmptySalt);
        }

        let hashids = Harsh::builder()
            .salt(salt)
            .length(min_length)
            .build()
            .map_err(|e| CodecError::Build(e.to_string()))?;

        Ok(Self { hashids, min_length })
    }

    /// Encodes an invitation triple into a code of at least `min_length` characters.
    pub fn encode(&self, invitee: i64, apartment: i64, inviter: i64) -> Result<String, CodecError> {
        let numbers = [invitee, apartment, inviter]
            .iter()
            .map(|&n| u64::try_from(n).map_err(|_| CodecError::NegativeInput))
            .collect::<Result<Vec<u64>, _>>()?;

        Ok(self.hashids.encode(&numbers))
    }

    /// Decodes a code back into `(invitee, apartment, inviter)`.
    pub fn decode(&self, code: &str) -> Result<(i64, i64, i64), CodecError> {
        if code.is_empty() || !code.is_ascii() {
            return Err(CodecError::InvalidCode);
        }

        let numbers = self
            .hashids
            .decode(code)
            .map_err(|_| CodecError::InvalidCode)?;
        if numbers.len() != TUPLE_ARITY || self.hashids.encode(&numbers) != code {
            return Err(CodecError::InvalidCode);
        }

        let to_id = |n: u64| i64::try_from(n).map_err(|_| CodecError::InvalidCode);
        Ok((to_id(numbers[0])?, to_id(numbers[1])?, to_id(numbers[2])?))
    }
}
