//! Authorization decisions over a resolved [`Principal`].
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy checks)

use serde::{Deserialize, Serialize};

use tenantgate_core::{TenantId, UserId};

use crate::{AccessError, AccessResult, Principal, Role};

/// Preconfigured gate a handler declares up front.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Any resolved principal.
    Authenticated,
    /// `supervisor` or above.
    Supervisor,
    /// `admin` or above.
    Admin,
    /// `owner` only.
    Owner,
}

impl Gate {
    pub fn min_role(self) -> Option<Role> {
        match self {
            Gate::Authenticated => None,
            Gate::Supervisor => Some(Role::Supervisor),
            Gate::Admin => Some(Role::Admin),
            Gate::Owner => Some(Role::Owner),
        }
    }

    pub fn check(self, principal: &Principal) -> AccessResult<()> {
        match self.min_role() {
            Some(role) => require_role(principal, role),
            None => Ok(()),
        }
    }
}

/// Fail with `Forbidden` unless the principal's role dominates `need`.
pub fn require_role(principal: &Principal, need: Role) -> AccessResult<()> {
    if principal.role().dominates(need) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.id(),
            role = %principal.role(),
            required = %need,
            "insufficient role"
        );
        Err(AccessError::Forbidden)
    }
}

/// `true` iff the principal belongs to `resource_tenant`. Role plays no part.
pub fn same_tenant(principal: &Principal, resource_tenant: TenantId) -> bool {
    principal.tenant_id() == resource_tenant
}

/// Fail with `Forbidden` when the resource belongs to another tenant.
pub fn ensure_same_tenant(principal: &Principal, resource_tenant: TenantId) -> AccessResult<()> {
    if same_tenant(principal, resource_tenant) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %principal.id(),
            tenant_id = %principal.tenant_id(),
            resource_tenant_id = %resource_tenant,
            "cross-tenant access rejected"
        );
        Err(AccessError::Forbidden)
    }
}

/// Operations a principal may never aim at themselves.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelfTargeted {
    ChangeRole,
    Remove,
}

/// Fail with `BadRequest` when `target` is the acting principal.
pub fn ensure_not_self(principal: &Principal, target: UserId, op: SelfTargeted) -> AccessResult<()> {
    if principal.id() != target {
        return Ok(());
    }
    let msg = match op {
        SelfTargeted::ChangeRole => "cannot modify own role",
        SelfTargeted::Remove => "cannot remove self",
    };
    Err(AccessError::bad_request(msg))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Users,
    Company,
    Invitations,
}

/// Resource-level policy used for UI affordances and per-record checks.
///
/// Users may always act on their own record; viewing other members needs
/// `supervisor`; everything else needs `admin`.
pub fn can_perform(
    principal: &Principal,
    action: Action,
    resource: Resource,
    target: Option<UserId>,
) -> bool {
    let role = principal.role();
    match resource {
        Resource::Company | Resource::Invitations => role.dominates(Role::Admin),
        Resource::Users => {
            if target == Some(principal.id()) {
                return true;
            }
            match action {
                Action::View => role.dominates(Role::Supervisor),
                Action::Create | Action::Update | Action::Delete => role.dominates(Role::Admin),
            }
        }
    }
}
