//! Company (tenant) settings and registration.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ports::TenantStore;
use crate::{
    AccessError, AccessResult, Account, Company, CompanyPatch, Principal, Role, require_role,
};

#[derive(Clone)]
pub struct CompanyService {
    tenants: Arc<dyn TenantStore>,
}

impl CompanyService {
    pub fn new(tenants: Arc<dyn TenantStore>) -> Self {
        Self { tenants }
    }

    /// The actor's own company. There is no way to address another tenant here.
    pub async fn company(&self, actor: &Principal) -> AccessResult<Company> {
        self.tenants
            .company(actor.tenant_id())
            .await?
            .ok_or_else(|| AccessError::not_found("company"))
    }

    pub async fn update_company(
        &self,
        actor: &Principal,
        patch: &CompanyPatch,
        now: DateTime<Utc>,
    ) -> AccessResult<Company> {
        let patch = patch.normalized()?;
        if patch.is_empty() {
            return Err(AccessError::bad_request("nothing to update"));
        }
        require_role(actor, Role::Admin)?;

        let company = self
            .tenants
            .update_company(actor.tenant_id(), &patch, now)
            .await?
            .ok_or_else(|| AccessError::not_found("company"))?;

        tracing::info!(tenant_id = %company.id, updated_by = %actor.id(), "company updated");
        Ok(company)
    }

    /// Create a company and make `account` its owner.
    pub async fn register_company(
        &self,
        account: &Account,
        name: &str,
        now: DateTime<Utc>,
    ) -> AccessResult<Company> {
        let company = Company::register(name, now)?;
        if account.has_active_membership() {
            return Err(AccessError::conflict("user already belongs to a company"));
        }

        let company = self
            .tenants
            .create_with_owner(company, account.id())
            .await
            .map_err(|e| match AccessError::from(e) {
                AccessError::Conflict(_) => AccessError::conflict("company slug already taken"),
                other => other,
            })?;

        tracing::info!(tenant_id = %company.id, owner = %account.id(), slug = %company.slug, "company registered");
        Ok(company)
    }

    /// Soft-deactivate the actor's company (owner only).
    pub async fn deactivate_company(&self, actor: &Principal, now: DateTime<Utc>) -> AccessResult<Company> {
        require_role(actor, Role::Owner)?;
        let company = self
            .tenants
            .set_company_active(actor.tenant_id(), false, now)
            .await?
            .ok_or_else(|| AccessError::not_found("company"))?;

        tracing::warn!(tenant_id = %company.id, deactivated_by = %actor.id(), "company deactivated");
        Ok(company)
    }
}
