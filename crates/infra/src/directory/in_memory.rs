use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tenantgate_auth::ports::{InvitationStore, ProfileStore, StoreError, TenantStore};
use tenantgate_auth::{
    Company, CompanyPatch, Invitation, MemberUpdate, ProfilePatch, Role, UserProfile,
};
use tenantgate_core::{EmailAddress, InvitationId, TenantId, UserId};

#[derive(Debug, Default)]
struct Directory {
    profiles: HashMap<UserId, UserProfile>,
    companies: HashMap<TenantId, Company>,
    // Insertion order doubles as creation order.
    invitations: Vec<Invitation>,
}

impl Directory {
    fn pending_slot_taken(&self, tenant_id: TenantId, email: &EmailAddress, now: DateTime<Utc>) -> bool {
        self.invitations
            .iter()
            .any(|i| i.tenant_id == tenant_id && &i.email == email && i.is_pending_at(now))
    }
}

/// In-memory profile, company and invitation directory.
///
/// Intended for tests/dev. A single lock guards all three collections, which
/// makes every conditional write (pending insert, accept, tenant-scoped
/// update) atomic with respect to the others.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: Mutex<Directory>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Directory>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    /// Seed or replace a profile (the sign-up path belongs to the auth provider).
    pub fn insert_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.lock()?.profiles.insert(profile.id, profile);
        Ok(())
    }

    pub fn insert_company(&self, company: Company) -> Result<(), StoreError> {
        let mut dir = self.lock()?;
        if dir
            .companies
            .values()
            .any(|c| c.slug == company.slug && c.id != company.id)
        {
            return Err(StoreError::Conflict(format!("slug {} taken", company.slug)));
        }
        dir.companies.insert(company.id, company);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryDirectory {
    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.lock()?.profiles.get(&id).cloned())
    }

    async fn active_member_by_email(
        &self,
        tenant_id: TenantId,
        email: &EmailAddress,
    ) -> Result<Option<UserProfile>, StoreError> {
        Ok(self
            .lock()?
            .profiles
            .values()
            .find(|p| p.is_member_of(tenant_id) && email.matches(&p.email))
            .cloned())
    }

    async fn members(&self, tenant_id: TenantId) -> Result<Vec<UserProfile>, StoreError> {
        let mut members: Vec<UserProfile> = self
            .lock()?
            .profiles
            .values()
            .filter(|p| p.tenant_id == Some(tenant_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(members)
    }

    async fn update_details(
        &self,
        id: UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<UserProfile>, StoreError> {
        let mut dir = self.lock()?;
        Ok(dir.profiles.get_mut(&id).map(|p| {
            patch.apply_to(p);
            p.clone()
        }))
    }

    async fn update_membership(
        &self,
        id: UserId,
        tenant_id: TenantId,
        update: &MemberUpdate,
    ) -> Result<Option<UserProfile>, StoreError> {
        let mut dir = self.lock()?;
        Ok(dir
            .profiles
            .get_mut(&id)
            .filter(|p| p.tenant_id == Some(tenant_id))
            .map(|p| {
                update.apply_to(p);
                p.clone()
            }))
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(p) = self.lock()?.profiles.get_mut(&id) {
            p.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl TenantStore for InMemoryDirectory {
    async fn company(&self, id: TenantId) -> Result<Option<Company>, StoreError> {
        Ok(self.lock()?.companies.get(&id).cloned())
    }

    async fn create_with_owner(&self, company: Company, owner: UserId) -> Result<Company, StoreError> {
        let mut dir = self.lock()?;
        if dir.companies.values().any(|c| c.slug == company.slug) {
            return Err(StoreError::Conflict(format!("slug {} taken", company.slug)));
        }
        let profile = dir
            .profiles
            .get_mut(&owner)
            .ok_or_else(|| StoreError::Integrity(format!("profile {owner} missing")))?;
        profile.tenant_id = Some(company.id);
        profile.role = Role::Owner;
        profile.is_active = true;
        dir.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn update_company(
        &self,
        id: TenantId,
        patch: &CompanyPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>, StoreError> {
        let mut dir = self.lock()?;
        Ok(dir.companies.get_mut(&id).map(|c| {
            patch.apply_to(c, now);
            c.clone()
        }))
    }

    async fn set_company_active(
        &self,
        id: TenantId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>, StoreError> {
        let mut dir = self.lock()?;
        Ok(dir.companies.get_mut(&id).map(|c| {
            c.is_active = active;
            c.updated_at = now;
            c.clone()
        }))
    }
}

#[async_trait]
impl InvitationStore for InMemoryDirectory {
    async fn insert_pending(
        &self,
        invitation: Invitation,
        now: DateTime<Utc>,
    ) -> Result<Invitation, StoreError> {
        let mut dir = self.lock()?;
        if dir.pending_slot_taken(invitation.tenant_id, &invitation.email, now) {
            return Err(StoreError::Conflict(format!(
                "pending invitation exists for {}",
                invitation.email
            )));
        }
        if dir.invitations.iter().any(|i| i.token == invitation.token) {
            return Err(StoreError::Conflict("invitation token collision".to_string()));
        }
        dir.invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn invitation(&self, id: InvitationId) -> Result<Option<Invitation>, StoreError> {
        Ok(self.lock()?.invitations.iter().find(|i| i.id == id).cloned())
    }

    async fn invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        Ok(self
            .lock()?
            .invitations
            .iter()
            .find(|i| i.token.as_str() == token)
            .cloned())
    }

    async fn pending_for_tenant(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, StoreError> {
        Ok(self
            .lock()?
            .invitations
            .iter()
            .rev()
            .filter(|i| i.tenant_id == tenant_id && i.is_pending_at(now))
            .cloned()
            .collect())
    }

    async fn accept_pending(
        &self,
        token: &str,
        account: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Invitation>, StoreError> {
        let mut dir = self.lock()?;
        let Directory {
            profiles,
            invitations,
            ..
        } = &mut *dir;

        let Some(invitation) = invitations
            .iter_mut()
            .find(|i| i.token.as_str() == token && i.is_pending_at(now))
        else {
            return Ok(None);
        };
        // Check the profile before touching the invitation so a failure leaves both as they were.
        let profile = profiles
            .get_mut(&account)
            .ok_or_else(|| StoreError::Integrity(format!("profile {account} missing")))?;

        invitation.mark_accepted(now);
        profile.tenant_id = Some(invitation.tenant_id);
        profile.role = invitation.role;
        profile.is_active = true;
        Ok(Some(invitation.clone()))
    }

    async fn expire(
        &self,
        id: InvitationId,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut dir = self.lock()?;
        if let Some(invitation) = dir
            .invitations
            .iter_mut()
            .find(|i| i.id == id && i.tenant_id == tenant_id)
        {
            invitation.expire_at(now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tenantgate_auth::InviteRequest;

    fn company(name: &str) -> Company {
        Company::register(name, Utc::now()).unwrap()
    }

    fn invitation(tenant_id: TenantId, email: &str, now: DateTime<Utc>) -> Invitation {
        let request = InviteRequest::parse(email, "operator", None).unwrap();
        Invitation::issue(tenant_id, UserId::new(), &request, now, Duration::days(7)).unwrap()
    }

    #[tokio::test]
    async fn second_pending_insert_for_same_email_conflicts() {
        let dir = InMemoryDirectory::new();
        let tenant = TenantId::new();
        let now = Utc::now();

        dir.insert_pending(invitation(tenant, "a@x.io", now), now).await.unwrap();
        let err = dir
            .insert_pending(invitation(tenant, "A@X.io", now), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Another tenant has its own slot.
        dir.insert_pending(invitation(TenantId::new(), "a@x.io", now), now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_invitation_frees_the_pending_slot() {
        let dir = InMemoryDirectory::new();
        let tenant = TenantId::new();
        let t0 = Utc::now();
        let first = dir.insert_pending(invitation(tenant, "a@x.io", t0), t0).await.unwrap();

        let t1 = t0 + Duration::minutes(1);
        dir.expire(first.id, tenant, t1).await.unwrap();
        dir.insert_pending(invitation(tenant, "a@x.io", t1), t1).await.unwrap();
        assert_eq!(dir.pending_for_tenant(tenant, t1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn expire_is_scoped_to_tenant() {
        let dir = InMemoryDirectory::new();
        let tenant = TenantId::new();
        let now = Utc::now();
        let inv = dir.insert_pending(invitation(tenant, "a@x.io", now), now).await.unwrap();

        dir.expire(inv.id, TenantId::new(), now).await.unwrap();
        let stored = dir.invitation(inv.id).await.unwrap().unwrap();
        assert!(stored.is_pending_at(now));
    }

    #[tokio::test]
    async fn accept_without_profile_leaves_invitation_pending() {
        let dir = InMemoryDirectory::new();
        let tenant = TenantId::new();
        let now = Utc::now();
        let inv = dir.insert_pending(invitation(tenant, "a@x.io", now), now).await.unwrap();

        let err = dir
            .accept_pending(inv.token.as_str(), UserId::new(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
        assert!(dir.invitation(inv.id).await.unwrap().unwrap().is_pending_at(now));
    }

    #[tokio::test]
    async fn update_membership_requires_matching_tenant() {
        let dir = InMemoryDirectory::new();
        let tenant = TenantId::new();
        let mut profile = UserProfile::signed_up(UserId::new(), "a@x.io", Utc::now());
        profile.tenant_id = Some(tenant);
        dir.insert_profile(profile.clone()).unwrap();

        let update = MemberUpdate::deactivate();
        assert!(
            dir.update_membership(profile.id, TenantId::new(), &update)
                .await
                .unwrap()
                .is_none()
        );
        let updated = dir.update_membership(profile.id, tenant, &update).await.unwrap().unwrap();
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn company_slug_is_unique() {
        let dir = InMemoryDirectory::new();
        let owner_a = UserProfile::signed_up(UserId::new(), "a@x.io", Utc::now());
        let owner_b = UserProfile::signed_up(UserId::new(), "b@x.io", Utc::now());
        dir.insert_profile(owner_a.clone()).unwrap();
        dir.insert_profile(owner_b.clone()).unwrap();

        dir.create_with_owner(company("Acme"), owner_a.id).await.unwrap();
        let err = dir.create_with_owner(company("ACME"), owner_b.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(dir.profile(owner_b.id).await.unwrap().unwrap().tenant_id, None);
    }
}
