//! Durable user profile as read from (and patched in) the profile store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantgate_core::{DomainError, DomainResult, TenantId, UserId};

use crate::Role;

const NAME_MAX: usize = 50;

/// Storage-owned record backing a principal.
///
/// The authorization layer never persists this itself; it reads it to build a
/// [`crate::Principal`] and issues scoped patches through
/// [`crate::ports::ProfileStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// A freshly signed-up profile: active, no tenant yet, lowest role.
    pub fn signed_up(id: UserId, email: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: None,
            last_name: None,
            avatar_url: None,
            role: Role::Operator,
            tenant_id: None,
            is_active: true,
            last_login_at: None,
            created_at,
        }
    }

    /// Active member of `tenant_id`.
    pub fn is_member_of(&self, tenant_id: TenantId) -> bool {
        self.is_active && self.tenant_id == Some(tenant_id)
    }

    /// Case-insensitive search over names and email.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [Some(&self.email), self.first_name.as_ref(), self.last_name.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Self-service patch of display fields.
///
/// `None` leaves a field untouched; `avatar_url: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(first) = &self.first_name {
            validate_name("first name", first)?;
        }
        if let Some(last) = &self.last_name {
            validate_name("last name", last)?;
        }
        if let Some(Some(url)) = &self.avatar_url {
            validate_http_url("avatar URL", url)?;
        }
        Ok(())
    }

    /// Trimmed copy of the patch, applied after validation.
    pub fn normalized(&self) -> Self {
        Self {
            first_name: self.first_name.as_ref().map(|s| s.trim().to_string()),
            last_name: self.last_name.as_ref().map(|s| s.trim().to_string()),
            avatar_url: self.avatar_url.clone(),
        }
    }

    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(first) = &self.first_name {
            profile.first_name = Some(first.clone());
        }
        if let Some(last) = &self.last_name {
            profile.last_name = Some(last.clone());
        }
        if let Some(avatar) = &self.avatar_url {
            profile.avatar_url = avatar.clone();
        }
    }
}

/// Admin-issued change to a member's role and/or active flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl MemberUpdate {
    pub fn deactivate() -> Self {
        Self {
            role: None,
            is_active: Some(false),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.role.is_none() && self.is_active.is_none() {
            return Err(DomainError::validation("nothing to update"));
        }
        if let Some(role) = self.role {
            if !role.is_assignable() {
                return Err(DomainError::validation(
                    "role must be admin, supervisor, or operator",
                ));
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(role) = self.role {
            profile.role = role;
        }
        if let Some(active) = self.is_active {
            profile.is_active = active;
        }
    }
}

fn validate_name(field: &str, value: &str) -> DomainResult<()> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if len > NAME_MAX {
        return Err(DomainError::validation(format!("{field} too long")));
    }
    Ok(())
}

/// Basic shape check for user-supplied links (avatars, logos).
pub(crate) fn validate_http_url(field: &str, value: &str) -> DomainResult<()> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') && !value.chars().any(char::is_whitespace) => {
            Ok(())
        }
        _ => Err(DomainError::validation(format!("invalid {field}"))),
    }
}
