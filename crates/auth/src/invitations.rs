//! Invitation lifecycle: issue, preview, accept, cancel, list.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use tenantgate_core::{InvitationId, TenantId};

use crate::ports::{InvitationNotifier, InvitationStore, ProfileStore, TenantStore};
use crate::{
    AccessError, AccessResult, Account, CompanyPreview, Invitation, InvitationPreview,
    InviteRequest, Principal, Role, ensure_same_tenant, require_role,
};

/// Invitation settings supplied by configuration.
#[derive(Debug, Clone)]
pub struct InvitationSettings {
    pub ttl: Duration,
    /// Base URL of the accept page; the token is appended as `?token=`.
    pub accept_url: String,
}

impl InvitationSettings {
    pub fn accept_link(&self, invitation: &Invitation) -> String {
        let sep = if self.accept_url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.accept_url, sep, invitation.token.as_str())
    }
}

/// Outcome of the notification side effect of `invite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Failed(String),
}

/// A created invitation plus the (non-transactional) notification result.
#[derive(Debug, Clone)]
pub struct IssuedInvitation {
    pub invitation: Invitation,
    pub notification: NotificationStatus,
}

impl IssuedInvitation {
    pub fn warning(&self) -> Option<&str> {
        match &self.notification {
            NotificationStatus::Sent => None,
            NotificationStatus::Failed(_) => Some("invitation created but the notification could not be delivered"),
        }
    }
}

#[derive(Clone)]
pub struct InvitationService {
    profiles: Arc<dyn ProfileStore>,
    tenants: Arc<dyn TenantStore>,
    invitations: Arc<dyn InvitationStore>,
    notifier: Arc<dyn InvitationNotifier>,
    settings: InvitationSettings,
}

impl InvitationService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        tenants: Arc<dyn TenantStore>,
        invitations: Arc<dyn InvitationStore>,
        notifier: Arc<dyn InvitationNotifier>,
        settings: InvitationSettings,
    ) -> Self {
        Self {
            profiles,
            tenants,
            invitations,
            notifier,
            settings,
        }
    }

    /// Invite `request.email` into `tenant_id`. `request` is already validated.
    pub async fn invite(
        &self,
        actor: &Principal,
        tenant_id: TenantId,
        request: InviteRequest,
        now: DateTime<Utc>,
    ) -> AccessResult<IssuedInvitation> {
        require_role(actor, Role::Admin)?;
        ensure_same_tenant(actor, tenant_id)?;

        if self
            .profiles
            .active_member_by_email(tenant_id, &request.email)
            .await?
            .is_some()
        {
            return Err(AccessError::conflict("user already exists in this company"));
        }

        let draft = Invitation::issue(tenant_id, actor.id(), &request, now, self.settings.ttl)?;
        let invitation = self
            .invitations
            .insert_pending(draft, now)
            .await
            .map_err(|e| match AccessError::from(e) {
                AccessError::Conflict(_) => AccessError::conflict("invitation already sent to this email"),
                other => other,
            })?;

        tracing::info!(
            tenant_id = %tenant_id,
            invitation_id = %invitation.id,
            invited_by = %actor.id(),
            role = %invitation.role,
            "invitation created"
        );

        let link = self.settings.accept_link(&invitation);
        let notification = match self
            .notifier
            .notify_invited(&invitation.email, &actor.company().name, &link)
            .await
        {
            Ok(()) => NotificationStatus::Sent,
            Err(e) => {
                tracing::warn!(
                    invitation_id = %invitation.id,
                    error = %e,
                    "invitation notification failed; invitation kept"
                );
                NotificationStatus::Failed(e.to_string())
            }
        };

        Ok(IssuedInvitation {
            invitation,
            notification,
        })
    }

    /// Unauthenticated token lookup. Expired, accepted and unknown tokens are
    /// indistinguishable.
    pub async fn validate_token(&self, token: &str, now: DateTime<Utc>) -> AccessResult<InvitationPreview> {
        let invitation = self
            .invitations
            .invitation_by_token(token)
            .await?
            .filter(|inv| inv.is_pending_at(now))
            .ok_or_else(invalid_invitation)?;

        let Some(company) = self.tenants.company(invitation.tenant_id).await? else {
            tracing::error!(
                invitation_id = %invitation.id,
                tenant_id = %invitation.tenant_id,
                "pending invitation points to a missing company"
            );
            return Err(invalid_invitation());
        };

        Ok(InvitationPreview {
            email: invitation.email,
            role: invitation.role,
            company: CompanyPreview::from(&company.summary()),
            expires_at: invitation.expires_at,
        })
    }

    /// Accept on behalf of the signed-in account being onboarded.
    pub async fn accept(&self, account: &Account, token: &str, now: DateTime<Utc>) -> AccessResult<Invitation> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AccessError::bad_request("invitation token is required"));
        }

        let current = self
            .invitations
            .invitation_by_token(token)
            .await?
            .filter(|inv| inv.is_pending_at(now))
            .ok_or_else(invalid_invitation)?;

        if current.email != *account.verified_email() {
            tracing::warn!(
                user_id = %account.id(),
                invitation_id = %current.id,
                "invitation accepted by a different email"
            );
            return Err(AccessError::Forbidden);
        }

        // Moving the owner out would leave its company without one.
        if account.has_active_membership() && account.profile().role == Role::Owner {
            return Err(AccessError::conflict("company owner cannot join another company"));
        }

        // Re-checked atomically by the store at `now`.
        let accepted = self
            .invitations
            .accept_pending(token, account.id(), now)
            .await?
            .ok_or_else(invalid_invitation)?;

        tracing::info!(
            user_id = %account.id(),
            tenant_id = %accepted.tenant_id,
            invitation_id = %accepted.id,
            role = %accepted.role,
            "invitation accepted"
        );
        Ok(accepted)
    }

    /// Soft-expire. Idempotent for already expired or accepted invitations.
    pub async fn cancel(&self, actor: &Principal, invitation_id: InvitationId, now: DateTime<Utc>) -> AccessResult<()> {
        require_role(actor, Role::Admin)?;

        let Some(invitation) = self.invitations.invitation(invitation_id).await? else {
            return Err(AccessError::not_found("invitation"));
        };
        ensure_same_tenant(actor, invitation.tenant_id)?;

        if !invitation.is_pending_at(now) {
            return Ok(());
        }
        self.invitations.expire(invitation_id, invitation.tenant_id, now).await?;

        tracing::info!(
            tenant_id = %invitation.tenant_id,
            invitation_id = %invitation_id,
            cancelled_by = %actor.id(),
            "invitation cancelled"
        );
        Ok(())
    }

    pub async fn list_pending(
        &self,
        actor: &Principal,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> AccessResult<Vec<Invitation>> {
        require_role(actor, Role::Admin)?;
        ensure_same_tenant(actor, tenant_id)?;
        Ok(self.invitations.pending_for_tenant(tenant_id, now).await?)
    }
}

fn invalid_invitation() -> AccessError {
    AccessError::not_found("invalid or expired invitation")
}
