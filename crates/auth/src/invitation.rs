//! Invitation records and their time-based state machine.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use tenantgate_core::{DomainError, DomainResult, EmailAddress, InvitationId, TenantId, UserId};

use crate::{CompanySummary, Role};

const TOKEN_BYTES: usize = 32;
const MESSAGE_MAX: usize = 500;

/// Default lifetime of a freshly issued invitation.
pub const DEFAULT_INVITATION_TTL_HOURS: i64 = 7 * 24;

/// Longest lifetime configuration may request (one year).
pub const MAX_INVITATION_TTL_HOURS: i64 = 365 * 24;

/// Unguessable, single-use invitation token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationToken(String);

impl InvitationToken {
    /// 256 bits from the OS-seeded thread RNG, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn from_string(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("InvitationToken(<redacted>)")
    }
}

/// Lifecycle state, always evaluated against an instant of use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationState {
    Pending,
    Accepted,
    Expired,
}

/// Pending offer for an email address to join a tenant at a role.
///
/// # Invariants
/// - `expires_at = created_at + TTL` at issue; later only ever moved earlier
///   (cancellation).
/// - `accepted_at` is set at most once and never cleared.
/// - Never physically deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub tenant_id: TenantId,
    pub invited_by: UserId,
    pub email: EmailAddress,
    pub role: Role,
    pub token: InvitationToken,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn issue(
        tenant_id: TenantId,
        invited_by: UserId,
        request: &InviteRequest,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DomainResult<Self> {
        let expires_at = now
            .checked_add_signed(ttl)
            .filter(|at| *at > now)
            .ok_or_else(|| DomainError::validation("invitation lifetime out of range"))?;
        Ok(Self {
            id: InvitationId::new(),
            tenant_id,
            invited_by,
            email: request.email.clone(),
            role: request.role,
            token: InvitationToken::generate(),
            message: request.message.clone(),
            created_at: now,
            expires_at,
            accepted_at: None,
        })
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> InvitationState {
        if self.accepted_at.is_some() {
            InvitationState::Accepted
        } else if self.expires_at > now {
            InvitationState::Pending
        } else {
            InvitationState::Expired
        }
    }

    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == InvitationState::Pending
    }

    /// Soft-expire: move `expires_at` to `now` if that closes a pending
    /// invitation. Returns whether anything changed; never re-opens.
    pub fn expire_at(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_pending_at(now) {
            return false;
        }
        self.expires_at = now;
        true
    }

    /// Terminal transition. Callers must have checked `is_pending_at(now)`
    /// under the same atomic section.
    pub fn mark_accepted(&mut self, now: DateTime<Utc>) {
        debug_assert!(self.accepted_at.is_none());
        self.accepted_at = Some(now);
    }
}

/// Validated input to `invite`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteRequest {
    pub email: EmailAddress,
    pub role: Role,
    pub message: Option<String>,
}

impl InviteRequest {
    /// Validate raw input before any lookup happens.
    pub fn parse(email: &str, role: &str, message: Option<String>) -> DomainResult<Self> {
        let email = EmailAddress::parse(email)?;
        let role: Role = role.parse()?;
        Self::new(email, role, message)
    }

    pub fn new(email: EmailAddress, role: Role, message: Option<String>) -> DomainResult<Self> {
        if !role.is_assignable() {
            return Err(DomainError::validation(
                "role must be admin, supervisor, or operator",
            ));
        }
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        if let Some(m) = &message {
            if m.chars().count() > MESSAGE_MAX {
                return Err(DomainError::validation("message too long"));
            }
        }
        Ok(Self { email, role, message })
    }
}

/// Public view of a pending invitation, safe for unauthenticated callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationPreview {
    pub email: EmailAddress,
    pub role: Role,
    pub company: CompanyPreview,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyPreview {
    pub name: String,
    pub slug: String,
}

impl From<&CompanySummary> for CompanyPreview {
    fn from(value: &CompanySummary) -> Self {
        Self {
            name: value.name.clone(),
            slug: value.slug.to_string(),
        }
    }
}
