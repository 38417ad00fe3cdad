use serde::{Deserialize, Serialize};

use tenantgate_core::{EmailAddress, TenantId, UserId};

use crate::{Company, CompanySummary, Role, UserProfile};

/// Opaque session credential (cookie value or bearer token).
///
/// Only the session provider interprets it; it is never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` for an empty/blank value, which callers treat as "no credential".
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Identity vouched for by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIdentity {
    pub user_id: UserId,
    pub verified_email: EmailAddress,
}

/// Why a profile cannot back a principal.
///
/// All variants surface to callers as `Unauthenticated`, except
/// `CompanyMissing`, which is a data-integrity fault. The distinction is kept
/// for logs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnusableProfile {
    ProfileMissing,
    ProfileInactive,
    NoTenant,
    CompanyMissing,
    CompanyInactive,
}

impl UnusableProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnusableProfile::ProfileMissing => "profile_missing",
            UnusableProfile::ProfileInactive => "profile_inactive",
            UnusableProfile::NoTenant => "no_tenant",
            UnusableProfile::CompanyMissing => "company_missing",
            UnusableProfile::CompanyInactive => "company_inactive",
        }
    }
}

/// Fully resolved actor for one request.
///
/// Only constructible from an active profile that belongs to an active
/// company; a principal is never partially valid. Built fresh per request and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: UserId,
    email: String,
    role: Role,
    company: CompanySummary,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl Principal {
    pub fn from_profile(profile: &UserProfile, company: &Company) -> Result<Self, UnusableProfile> {
        if !profile.is_active {
            return Err(UnusableProfile::ProfileInactive);
        }
        let Some(tenant_id) = profile.tenant_id else {
            return Err(UnusableProfile::NoTenant);
        };
        if company.id != tenant_id {
            return Err(UnusableProfile::CompanyMissing);
        }
        if !company.is_active {
            return Err(UnusableProfile::CompanyInactive);
        }

        Ok(Self {
            id: profile.id,
            email: profile.email.clone(),
            role: profile.role,
            company: company.summary(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tenant_id(&self) -> TenantId {
        self.company.id
    }

    pub fn company(&self) -> &CompanySummary {
        &self.company
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }
}

/// A session-validated user whose profile may not (yet) qualify as a
/// [`Principal`]: freshly signed up, or deactivated and being re-invited.
///
/// Only onboarding operations accept an `Account`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    identity: RawIdentity,
    profile: UserProfile,
}

impl Account {
    pub fn new(identity: RawIdentity, profile: UserProfile) -> Self {
        Self { identity, profile }
    }

    pub fn id(&self) -> UserId {
        self.identity.user_id
    }

    pub fn verified_email(&self) -> &EmailAddress {
        &self.identity.verified_email
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Active member of some tenant.
    pub fn has_active_membership(&self) -> bool {
        self.profile.is_active && self.profile.tenant_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn company() -> Company {
        Company::register("Acme", Utc::now()).unwrap()
    }

    fn member_of(company: &Company) -> UserProfile {
        let mut p = UserProfile::signed_up(UserId::new(), "ops@acme.io", Utc::now());
        p.tenant_id = Some(company.id);
        p.role = Role::Supervisor;
        p
    }

    #[test]
    fn builds_from_active_member() {
        let company = company();
        let profile = member_of(&company);
        let principal = Principal::from_profile(&profile, &company).unwrap();
        assert_eq!(principal.tenant_id(), company.id);
        assert_eq!(principal.role(), Role::Supervisor);
        assert_eq!(principal.company().slug.as_str(), "acme");
    }

    #[test]
    fn inactive_profile_is_unusable() {
        let company = company();
        let mut profile = member_of(&company);
        profile.is_active = false;
        assert_eq!(
            Principal::from_profile(&profile, &company),
            Err(UnusableProfile::ProfileInactive)
        );
    }

    #[test]
    fn tenantless_profile_is_unusable() {
        let company = company();
        let mut profile = member_of(&company);
        profile.tenant_id = None;
        assert_eq!(
            Principal::from_profile(&profile, &company),
            Err(UnusableProfile::NoTenant)
        );
    }

    #[test]
    fn mismatched_or_inactive_company_is_unusable() {
        let company = company();
        let profile = member_of(&company);
        let other = Company::register("Other", Utc::now()).unwrap();
        assert_eq!(
            Principal::from_profile(&profile, &other),
            Err(UnusableProfile::CompanyMissing)
        );

        let mut closed = company.clone();
        closed.is_active = false;
        assert_eq!(
            Principal::from_profile(&profile, &closed),
            Err(UnusableProfile::CompanyInactive)
        );
    }

    #[test]
    fn credential_is_redacted_and_blank_is_absent() {
        assert!(Credential::new("   ").is_none());
        let cred = Credential::new("secret-token").unwrap();
        assert_eq!(format!("{cred:?}"), "Credential(<redacted>)");
        assert_eq!(cred.expose(), "secret-token");
    }
}
