//! Tenant member management and self-service profile operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tenantgate_core::UserId;

use crate::ports::ProfileStore;
use crate::{
    AccessError, AccessResult, Action, MemberUpdate, Principal, ProfilePatch, Resource, Role,
    SelfTargeted, UserProfile, can_perform, ensure_not_self, ensure_same_tenant, require_role,
};

pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberQuery {
    pub search: Option<String>,
    pub page: usize,
    pub limit: usize,
}

impl Default for MemberQuery {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl MemberQuery {
    pub fn validate(&self) -> AccessResult<()> {
        if self.page == 0 {
            return Err(AccessError::bad_request("page must be at least 1"));
        }
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(AccessError::bad_request("limit must be between 1 and 100"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberPage {
    pub members: Vec<UserProfile>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
}

#[derive(Clone)]
pub struct MembershipService {
    profiles: Arc<dyn ProfileStore>,
}

impl MembershipService {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    pub async fn list_members(&self, actor: &Principal, query: &MemberQuery) -> AccessResult<MemberPage> {
        query.validate()?;
        require_role(actor, Role::Admin)?;

        let mut members = self.profiles.members(actor.tenant_id()).await?;
        if let Some(search) = query.search.as_deref() {
            members.retain(|m| m.matches_search(search));
        }

        let total = members.len();
        let start = (query.page - 1).saturating_mul(query.limit);
        let end = start.saturating_add(query.limit);
        let members: Vec<_> = members.into_iter().skip(start).take(query.limit).collect();

        Ok(MemberPage {
            members,
            total,
            page: query.page,
            limit: query.limit,
            has_more: end < total,
        })
    }

    /// One member of the actor's tenant (supervisors and up, or oneself).
    pub async fn member(&self, actor: &Principal, user_id: UserId) -> AccessResult<UserProfile> {
        if !can_perform(actor, Action::View, Resource::Users, Some(user_id)) {
            return Err(AccessError::Forbidden);
        }
        let profile = self.tenant_profile(actor, user_id).await?;
        Ok(profile)
    }

    /// Change a member's role and/or active flag.
    pub async fn update_member(
        &self,
        actor: &Principal,
        user_id: UserId,
        update: MemberUpdate,
    ) -> AccessResult<UserProfile> {
        update.validate()?;
        ensure_not_self(actor, user_id, SelfTargeted::ChangeRole)?;
        require_role(actor, Role::Admin)?;

        let target = self.tenant_profile(actor, user_id).await?;
        ensure_outranks(actor, &target)?;

        let updated = self
            .profiles
            .update_membership(user_id, actor.tenant_id(), &update)
            .await?
            .ok_or_else(|| AccessError::not_found("user"))?;

        tracing::info!(
            tenant_id = %actor.tenant_id(),
            user_id = %user_id,
            updated_by = %actor.id(),
            role = %updated.role,
            is_active = updated.is_active,
            "member updated"
        );
        Ok(updated)
    }

    /// Soft-remove: the profile stays, deactivated.
    pub async fn remove_member(&self, actor: &Principal, user_id: UserId) -> AccessResult<()> {
        ensure_not_self(actor, user_id, SelfTargeted::Remove)?;
        require_role(actor, Role::Admin)?;

        let target = self.tenant_profile(actor, user_id).await?;
        ensure_outranks(actor, &target)?;

        self.profiles
            .update_membership(user_id, actor.tenant_id(), &MemberUpdate::deactivate())
            .await?
            .ok_or_else(|| AccessError::not_found("user"))?;

        tracing::info!(
            tenant_id = %actor.tenant_id(),
            user_id = %user_id,
            removed_by = %actor.id(),
            "member removed"
        );
        Ok(())
    }

    /// Self-service: acts on the principal's own profile only.
    pub async fn update_own_profile(&self, actor: &Principal, patch: &ProfilePatch) -> AccessResult<UserProfile> {
        patch.validate()?;
        self.profiles
            .update_details(actor.id(), &patch.normalized())
            .await?
            .ok_or(AccessError::Unauthenticated)
    }

    /// Self-service: read back the principal's own profile.
    pub async fn own_profile(&self, actor: &Principal) -> AccessResult<UserProfile> {
        self.profiles
            .profile(actor.id())
            .await?
            .ok_or(AccessError::Unauthenticated)
    }

    /// Self-service: stamp `last_login_at`.
    pub async fn record_login(&self, actor: &Principal, now: DateTime<Utc>) -> AccessResult<()> {
        self.profiles.record_login(actor.id(), now).await?;
        Ok(())
    }

    async fn tenant_profile(&self, actor: &Principal, user_id: UserId) -> AccessResult<UserProfile> {
        let Some(profile) = self.profiles.profile(user_id).await? else {
            return Err(AccessError::not_found("user"));
        };
        match profile.tenant_id {
            Some(tenant_id) => ensure_same_tenant(actor, tenant_id)?,
            None => return Err(AccessError::Forbidden),
        }
        Ok(profile)
    }
}

/// Actors may only manage members they dominate (an admin cannot touch the owner).
fn ensure_outranks(actor: &Principal, target: &UserProfile) -> AccessResult<()> {
    if actor.role().dominates(target.role) {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}
