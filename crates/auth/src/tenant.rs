//! Company (tenant) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantgate_core::{DomainError, DomainResult, EmailAddress, Slug, TenantId};

use crate::profile::validate_http_url;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const DOMAIN_MAX: usize = 253;

/// A tenant. Never hard-deleted: deactivation flips `is_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: TenantId,
    pub name: String,
    pub slug: Slug,
    pub email: Option<String>,
    pub domain: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Build a new, active company from a display name.
    pub fn register(name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = validate_company_name(name)?;
        let slug = Slug::from_name(&name)?;
        Ok(Self {
            id: TenantId::new(),
            name,
            slug,
            email: None,
            domain: None,
            logo_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn summary(&self) -> CompanySummary {
        CompanySummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// The slice of a company carried by a principal and shown on invitation
/// previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub id: TenantId,
    pub name: String,
    pub slug: Slug,
}

/// Admin patch of company display/contact fields. The slug is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub domain: Option<Option<String>>,
    pub logo_url: Option<Option<String>>,
}

impl CompanyPatch {
    /// Validate and normalize (trimmed name, lower-cased email and domain).
    pub fn normalized(&self) -> DomainResult<Self> {
        let name = self.name.as_deref().map(validate_company_name).transpose()?;
        let email = match &self.email {
            Some(Some(raw)) => Some(Some(EmailAddress::parse(raw)?.to_string())),
            other => other.clone(),
        };
        let domain = match &self.domain {
            Some(Some(raw)) => Some(Some(validate_domain(raw)?)),
            other => other.clone(),
        };
        if let Some(Some(url)) = &self.logo_url {
            validate_http_url("logo URL", url)?;
        }
        Ok(Self {
            name,
            email,
            domain,
            logo_url: self.logo_url.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.domain.is_none() && self.logo_url.is_none()
    }

    pub fn apply_to(&self, company: &mut Company, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            company.name = name.clone();
        }
        if let Some(email) = &self.email {
            company.email = email.clone();
        }
        if let Some(domain) = &self.domain {
            company.domain = domain.clone();
        }
        if let Some(logo) = &self.logo_url {
            company.logo_url = logo.clone();
        }
        company.updated_at = now;
    }
}

fn validate_company_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < NAME_MIN {
        return Err(DomainError::validation(
            "company name must be at least 2 characters",
        ));
    }
    if len > NAME_MAX {
        return Err(DomainError::validation("company name too long"));
    }
    Ok(name.to_string())
}

/// Bare host name such as `acme.io`; no scheme, port or path.
fn validate_domain(raw: &str) -> DomainResult<String> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    let labels_ok = domain.contains('.')
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if domain.len() > DOMAIN_MAX || !labels_ok {
        return Err(DomainError::validation("invalid company domain"));
    }
    Ok(domain)
}
