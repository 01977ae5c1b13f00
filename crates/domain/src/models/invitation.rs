//! Invitation capability models.
//!
//! An invitation has no row of its own. It exists as the code handed to the
//! invitee plus a store entry keyed by the id triple, and it is valid exactly
//! while that entry exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The id triple embedded in an invitation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invitation {
    pub invitee_user_id: i64,
    pub apartment_id: i64,
    pub inviter_user_id: i64,
}

impl Invitation {
    pub fn new(invitee_user_id: i64, apartment_id: i64, inviter_user_id: i64) -> Self {
        Self {
            invitee_user_id,
            apartment_id,
            inviter_user_id,
        }
    }

    /// Store key `invitation:{invitee}:{apartment}:{inviter}`.
    pub fn store_key(&self) -> String {
        format!(
            "invitation:{}:{}:{}",
            self.invitee_user_id, self.apartment_id, self.inviter_user_id
        )
    }
}

/// Who may redeem a code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteePolicy {
    /// Any authenticated holder of the code joins the apartment.
    #[default]
    AnyHolder,
    /// Only the user the code was issued for may join.
    InviteeOnly,
}

impl FromStr for InviteePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any_holder" => Ok(InviteePolicy::AnyHolder),
            "invitee_only" => Ok(InviteePolicy::InviteeOnly),
            _ => Err(format!("Invalid invitee policy: {}", s)),
        }
    }
}

impl fmt::Display for InviteePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InviteePolicy::AnyHolder => write!(f, "any_holder"),
            InviteePolicy::InviteeOnly => write!(f, "invitee_only"),
        }
    }
}

/// A freshly issued invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct IssuedInvitation {
    pub code: String,
    pub invite_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Response body after joining an apartment.
#[derive(Debug, Clone, Serialize)]
pub struct JoinResponse {
    pub apartment_id: i64,
    pub message: String,
}
