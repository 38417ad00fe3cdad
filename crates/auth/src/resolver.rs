//! Request-scoped identity resolution and the authorization gate.

use std::sync::Arc;

use crate::ports::{ProfileStore, SessionProvider, TenantStore};
use crate::{
    AccessError, AccessResult, Account, Credential, Gate, Principal, RawIdentity, Role,
    UnusableProfile,
};

/// Turns an inbound credential into a [`Principal`] (or an [`Account`] for
/// onboarding flows).
///
/// Holds no state beyond its collaborators: every call re-resolves against
/// the provider and the stores.
#[derive(Clone)]
pub struct IdentityResolver {
    sessions: Arc<dyn SessionProvider>,
    profiles: Arc<dyn ProfileStore>,
    tenants: Arc<dyn TenantStore>,
}

impl IdentityResolver {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        profiles: Arc<dyn ProfileStore>,
        tenants: Arc<dyn TenantStore>,
    ) -> Self {
        Self {
            sessions,
            profiles,
            tenants,
        }
    }

    pub async fn resolve(&self, credential: Option<&Credential>) -> AccessResult<Principal> {
        let identity = self.identify(credential).await?;

        let Some(profile) = self.profiles.profile(identity.user_id).await? else {
            return Err(unusable(&identity, UnusableProfile::ProfileMissing));
        };
        if !profile.is_active {
            return Err(unusable(&identity, UnusableProfile::ProfileInactive));
        }
        let Some(tenant_id) = profile.tenant_id else {
            return Err(unusable(&identity, UnusableProfile::NoTenant));
        };

        let Some(company) = self.tenants.company(tenant_id).await? else {
            tracing::error!(
                user_id = %identity.user_id,
                tenant_id = %tenant_id,
                reason = UnusableProfile::CompanyMissing.as_str(),
                "profile points to a missing company"
            );
            return Err(AccessError::bad_request("user must belong to a company"));
        };

        Principal::from_profile(&profile, &company).map_err(|reason| unusable(&identity, reason))
    }

    /// Session-validated account whose profile exists; membership not required.
    pub async fn resolve_account(&self, credential: Option<&Credential>) -> AccessResult<Account> {
        let identity = self.identify(credential).await?;
        match self.profiles.profile(identity.user_id).await? {
            Some(profile) => Ok(Account::new(identity, profile)),
            None => Err(unusable(&identity, UnusableProfile::ProfileMissing)),
        }
    }

    /// Resolve and enforce `gate` before any handler logic runs.
    pub async fn authorize(&self, credential: Option<&Credential>, gate: Gate) -> AccessResult<Principal> {
        let principal = self.resolve(credential).await?;
        gate.check(&principal)?;
        Ok(principal)
    }

    pub async fn authorize_any(&self, credential: Option<&Credential>) -> AccessResult<Principal> {
        self.authorize(credential, Gate::Authenticated).await
    }

    pub async fn authorize_min_role(
        &self,
        credential: Option<&Credential>,
        role: Role,
    ) -> AccessResult<Principal> {
        let principal = self.resolve(credential).await?;
        crate::require_role(&principal, role)?;
        Ok(principal)
    }

    pub async fn sign_out(&self, credential: Option<&Credential>) -> AccessResult<()> {
        let Some(credential) = credential else {
            return Err(AccessError::Unauthenticated);
        };
        self.sessions.invalidate(credential).await?;
        Ok(())
    }

    async fn identify(&self, credential: Option<&Credential>) -> AccessResult<RawIdentity> {
        let Some(credential) = credential else {
            tracing::debug!(reason = "no_credential", "unauthenticated request");
            return Err(AccessError::Unauthenticated);
        };
        self.sessions.validate_credential(credential).await.map_err(|e| {
            tracing::debug!(error = %e, "credential not accepted");
            AccessError::from(e)
        })
    }
}

fn unusable(identity: &RawIdentity, reason: UnusableProfile) -> AccessError {
    tracing::info!(
        user_id = %identity.user_id,
        reason = reason.as_str(),
        "credential has no usable principal"
    );
    match reason {
        UnusableProfile::CompanyMissing => AccessError::bad_request("user must belong to a company"),
        UnusableProfile::ProfileMissing
        | UnusableProfile::ProfileInactive
        | UnusableProfile::NoTenant
        | UnusableProfile::CompanyInactive => AccessError::Unauthenticated,
    }
}
