//! Invitation issuance and one-time redemption.
//!
//! Per code the lifecycle is `NotIssued -> Issued(ttl) -> Consumed | Expired`.
//! Consumed and expired are indistinguishable to callers. Redemption burns the
//! store entry with a single atomic delete before any relational write, so
//! concurrent redeemers of one code see exactly one winner.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tracing::{info, warn};

use shared::capability::CapabilityCodec;
use shared::validation::normalize_handle;

use crate::error::DomainError;
use crate::models::{Invitation, InviteePolicy, IssuedInvitation};
use crate::ports::{MembershipRepository, Notifier, RepositoryError, UserRepository};
use crate::services::notification::joined_message;
use crate::store::InvitationStore;

/// Default invitation lifetime.
pub const DEFAULT_INVITATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct InvitationSettings {
    pub ttl: Duration,
    /// API base URL, e.g. `http://localhost:8080/api/v1`.
    pub base_url: String,
    pub invitee_policy: InviteePolicy,
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_INVITATION_TTL,
            base_url: "http://localhost:8080/api/v1".to_string(),
            invitee_policy: InviteePolicy::AnyHolder,
        }
    }
}

#[derive(Clone)]
pub struct InvitationService {
    codec: CapabilityCodec,
    store: InvitationStore,
    users: Arc<dyn UserRepository>,
    memberships: Arc<dyn MembershipRepository>,
    notifier: Arc<dyn Notifier>,
    settings: InvitationSettings,
}

impl InvitationService {
    pub fn new(
        codec: CapabilityCodec,
        store: InvitationStore,
        users: Arc<dyn UserRepository>,
        memberships: Arc<dyn MembershipRepository>,
        notifier: Arc<dyn Notifier>,
        settings: InvitationSettings,
    ) -> Self {
        Self {
            codec,
            store,
            users,
            memberships,
            notifier,
            settings,
        }
    }

    pub fn invite_url(&self, code: &str) -> String {
        format!(
            "{}/resident/apartment/invite/{}",
            self.settings.base_url.trim_end_matches('/'),
            code
        )
    }

    /// Issues an invitation from a manager to the user behind a Telegram handle.
    ///
    /// When only the notification fails the invitation stays valid and the
    /// error carries its URL.
    pub async fn create_invitation(
        &self,
        manager_id: i64,
        apartment_id: i64,
        telegram_handle: &str,
    ) -> Result<IssuedInvitation, DomainError> {
        let handle = normalize_handle(telegram_handle);

        let is_manager = self
            .memberships
            .is_manager(manager_id, apartment_id)
            .await
            .map_err(|e| DomainError::repository("verifying manager status", e))?;
        if !is_manager {
            warn!(
                user_id = manager_id,
                apartment_id = apartment_id,
                "Non-manager attempted to invite user"
            );
            return Err(DomainError::NotAuthorized);
        }

        let invitee = self
            .users
            .resolve_by_handle(handle)
            .await
            .map_err(|e| DomainError::repository("resolving telegram handle", e))?
            .ok_or(DomainError::UserNotFound)?;

        let already_member = self
            .memberships
            .is_member(invitee.id, apartment_id)
            .await
            .map_err(|e| DomainError::repository("checking membership", e))?;
        if already_member {
            return Err(DomainError::AlreadyMember);
        }

        let lifetime = chrono::Duration::from_std(self.settings.ttl)
            .map_err(|_| DomainError::Validation("invitation ttl out of range".to_string()))?;

        let invitation = Invitation::new(invitee.id, apartment_id, manager_id);
        let code = self.codec.encode(
            invitation.invitee_user_id,
            invitation.apartment_id,
            invitation.inviter_user_id,
        )?;

        self.store.issue(&invitation, self.settings.ttl).await?;

        let expires_at = Utc::now() + lifetime;
        let invite_url = self.invite_url(&code);
        counter!("invitations_created_total").increment(1);

        info!(
            user_id = manager_id,
            apartment_id = apartment_id,
            invitee_id = invitee.id,
            "Invitation issued"
        );

        if let Err(e) = self
            .notifier
            .send_invitation(&invite_url, apartment_id, handle, expires_at)
            .await
        {
            warn!(
                apartment_id = apartment_id,
                handle = %handle,
                error = %e,
                "Invitation created but notification failed"
            );
            counter!("notifications_failed_total", "kind" => "invitation").increment(1);
            return Err(DomainError::InvitationCreatedButNotificationFailed {
                invite_url,
                expires_at,
                reason: e.to_string(),
            });
        }

        Ok(IssuedInvitation {
            code,
            invite_url,
            expires_at,
        })
    }

    /// Redeems a code for `user_id`, returning the joined apartment id.
    pub async fn consume_invitation(&self, user_id: i64, code: &str) -> Result<i64, DomainError> {
        let (invitee_id, apartment_id, inviter_id) = self.codec.decode(code.trim())?;
        let invitation = Invitation::new(invitee_id, apartment_id, inviter_id);

        if !self.store.consume(&invitation).await? {
            warn!(user_id = user_id, apartment_id = apartment_id, "Invitation not found or already used");
            return Err(DomainError::AlreadyConsumedOrExpired);
        }

        // The code is burned at this point, whatever follows.
        if self.settings.invitee_policy == InviteePolicy::InviteeOnly && user_id != invitee_id {
            warn!(
                user_id = user_id,
                invitee_id = invitee_id,
                apartment_id = apartment_id,
                "Invitation redeemed by a different user"
            );
            return Err(DomainError::InviteeMismatch);
        }

        let already_member = self
            .memberships
            .is_member(user_id, apartment_id)
            .await
            .map_err(|e| DomainError::repository("checking membership", e))?;
        if already_member {
            return Err(DomainError::AlreadyMember);
        }

        match self
            .memberships
            .create_membership(user_id, apartment_id, false)
            .await
        {
            Ok(_) => {}
            Err(RepositoryError::Conflict(_)) => return Err(DomainError::AlreadyMember),
            Err(e) => return Err(DomainError::repository("creating membership", e)),
        }

        counter!("invitations_consumed_total").increment(1);
        info!(user_id = user_id, apartment_id = apartment_id, "User joined apartment");

        if let Err(e) = self
            .notifier
            .send_message(user_id, &joined_message(apartment_id))
            .await
        {
            warn!(user_id = user_id, error = %e, "Failed to send join notification");
            counter!("notifications_failed_total", "kind" => "join").increment(1);
        }

        Ok(apartment_id)
    }
}
