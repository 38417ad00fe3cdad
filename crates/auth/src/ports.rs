//! Collaborator contracts consumed by the authorization layer.
//!
//! Implementations live in `tenantgate-infra`. Every conditional write listed
//! here must be atomic at the storage layer (transaction or conditional
//! update); the services hold no locks and no cached state of their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tenantgate_core::{EmailAddress, InvitationId, TenantId, UserId};

use crate::{
    Company, CompanyPatch, Credential, Invitation, MemberUpdate, ProfilePatch, RawIdentity,
    UserProfile,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness or pending-slot constraint rejected the write.
    #[error("constraint violated: {0}")]
    Conflict(String),

    /// Stored data contradicts itself (e.g. a row the write depends on vanished).
    #[error("data integrity fault: {0}")]
    Integrity(String),

    /// Storage outage, network failure, poisoned lock.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The provider does not recognize the credential.
    #[error("credential rejected")]
    Rejected,

    #[error("session provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Hosted session/auth provider. The credential is opaque to this layer.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn validate_credential(&self, credential: &Credential) -> Result<RawIdentity, SessionError>;

    /// Sign-out.
    async fn invalidate(&self, credential: &Credential) -> Result<(), SessionError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Active profile with this email in `tenant_id`, if any.
    async fn active_member_by_email(
        &self,
        tenant_id: TenantId,
        email: &EmailAddress,
    ) -> Result<Option<UserProfile>, StoreError>;

    /// All profiles (active or not) whose `tenant_id` is `tenant_id`, newest first.
    async fn members(&self, tenant_id: TenantId) -> Result<Vec<UserProfile>, StoreError>;

    async fn update_details(
        &self,
        id: UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<UserProfile>, StoreError>;

    /// Conditional update: applies only while the profile still belongs to
    /// `tenant_id`. `None` when the condition no longer holds.
    async fn update_membership(
        &self,
        id: UserId,
        tenant_id: TenantId,
        update: &MemberUpdate,
    ) -> Result<Option<UserProfile>, StoreError>;

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn company(&self, id: TenantId) -> Result<Option<Company>, StoreError>;

    /// Insert `company` and make `owner` its active owner, atomically.
    /// `Conflict` when the slug is taken.
    async fn create_with_owner(&self, company: Company, owner: UserId) -> Result<Company, StoreError>;

    async fn update_company(
        &self,
        id: TenantId,
        patch: &CompanyPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>, StoreError>;

    /// Soft flag; companies are never deleted.
    async fn set_company_active(
        &self,
        id: TenantId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>, StoreError>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Insert only if no invitation for `(tenant_id, email)` is pending at
    /// `now`; `Conflict` otherwise (also on token collision).
    async fn insert_pending(
        &self,
        invitation: Invitation,
        now: DateTime<Utc>,
    ) -> Result<Invitation, StoreError>;

    async fn invitation(&self, id: InvitationId) -> Result<Option<Invitation>, StoreError>;

    async fn invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError>;

    /// Pending at `now`, newest first.
    async fn pending_for_tenant(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, StoreError>;

    /// If the invitation is still pending at `now`: set `accepted_at = now`
    /// and move `account` into the invitation's tenant with its role (and
    /// reactivate it), all or nothing. `None` when not pending.
    async fn accept_pending(
        &self,
        token: &str,
        account: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Invitation>, StoreError>;

    /// Set `expires_at = now` if the invitation of `tenant_id` is still
    /// pending; otherwise leave it untouched.
    async fn expire(
        &self,
        id: InvitationId,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Fire-and-forget delivery of invitation notices.
#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    async fn notify_invited(
        &self,
        email: &EmailAddress,
        company_name: &str,
        accept_url: &str,
    ) -> Result<(), NotifyError>;
}
