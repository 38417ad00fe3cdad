use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use tenantgate_auth::{
    CompanyPatch, Invitation, InvitationState, IssuedInvitation, MemberQuery, MemberUpdate,
    NotificationStatus, Principal, ProfilePatch, Role,
};
use tenantgate_core::{InvitationId, TenantId, UserId};

use crate::app::errors::ApiError;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct InviteRequestBody {
    pub email: String,
    pub role: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationBody {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct InvitationIdQuery {
    pub id: String,
}

impl InvitationIdQuery {
    pub fn invitation_id(&self) -> Result<InvitationId, ApiError> {
        self.id
            .parse()
            .map_err(|_| ApiError::bad_request("invalid invitation id"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberListParams {
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl From<MemberListParams> for MemberQuery {
    fn from(value: MemberListParams) -> Self {
        let defaults = MemberQuery::default();
        Self {
            search: value.search.filter(|s| !s.trim().is_empty()),
            page: value.page.unwrap_or(defaults.page),
            limit: value.limit.unwrap_or(defaults.limit),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MemberUpdateBody {
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl MemberUpdateBody {
    pub fn into_update(self) -> Result<MemberUpdate, ApiError> {
        let role = self
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        Ok(MemberUpdate {
            role,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

impl From<ProfileUpdateBody> for ProfilePatch {
    fn from(value: ProfileUpdateBody) -> Self {
        Self {
            first_name: value.first_name,
            last_name: value.last_name,
            avatar_url: value.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterCompanyBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CompanyUpdateBody {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub domain: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub logo_url: Option<Option<String>>,
}

impl From<CompanyUpdateBody> for CompanyPatch {
    fn from(value: CompanyUpdateBody) -> Self {
        Self {
            name: value.name,
            email: value.email,
            domain: value.domain,
            logo_url: value.logo_url,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: SessionUser,
    pub company: SessionCompany,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionCompany {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
}

impl From<&Principal> for SessionResponse {
    fn from(p: &Principal) -> Self {
        Self {
            user: SessionUser {
                id: p.id(),
                email: p.email().to_string(),
                role: p.role(),
                first_name: p.first_name().map(str::to_string),
                last_name: p.last_name().map(str::to_string),
            },
            company: SessionCompany {
                id: p.tenant_id(),
                name: p.company().name.clone(),
                slug: p.company().slug.to_string(),
            },
        }
    }
}

/// Invitation as shown to admins. The token only travels in the notice.
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: InvitationId,
    pub tenant_id: TenantId,
    pub email: String,
    pub role: Role,
    pub invited_by: UserId,
    pub message: Option<String>,
    pub state: InvitationState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl InvitationResponse {
    pub fn at(invitation: &Invitation, now: DateTime<Utc>) -> Self {
        Self {
            id: invitation.id,
            tenant_id: invitation.tenant_id,
            email: invitation.email.to_string(),
            role: invitation.role,
            invited_by: invitation.invited_by,
            message: invitation.message.clone(),
            state: invitation.state_at(now),
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
            accepted_at: invitation.accepted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssuedInvitationResponse {
    pub invitation: InvitationResponse,
    pub notification: NotificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl IssuedInvitationResponse {
    pub fn at(issued: &IssuedInvitation, now: DateTime<Utc>) -> Self {
        Self {
            invitation: InvitationResponse::at(&issued.invitation, now),
            notification: issued.notification.clone(),
            warning: issued.warning().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_null_patch_fields_differ() {
        let absent: ProfileUpdateBody = serde_json::from_str(r#"{"first_name":"Ana"}"#).unwrap();
        assert_eq!(absent.avatar_url, None);

        let cleared: ProfileUpdateBody = serde_json::from_str(r#"{"avatar_url":null}"#).unwrap();
        assert_eq!(cleared.avatar_url, Some(None));
    }

    #[test]
    fn member_update_accepts_legacy_role_tag() {
        let body: MemberUpdateBody = serde_json::from_str(r#"{"role":"operador"}"#).unwrap();
        assert_eq!(body.into_update().unwrap().role, Some(Role::Operator));

        let body: MemberUpdateBody = serde_json::from_str(r#"{"role":"root"}"#).unwrap();
        assert!(body.into_update().is_err());
    }

    #[test]
    fn list_params_fall_back_to_defaults() {
        let query = MemberQuery::from(MemberListParams {
            search: Some("  ".into()),
            ..MemberListParams::default()
        });
        assert_eq!(query, MemberQuery::default());
    }
}
