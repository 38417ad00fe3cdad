//! Invitation endpoints under `/users`.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use tenantgate_auth::{Gate, InvitationPreview, InviteRequest};

use crate::app::dto::{
    AcceptInvitationBody, InvitationIdQuery, InvitationResponse, InviteRequestBody,
    IssuedInvitationResponse, TokenQuery,
};
use crate::app::errors::ApiError;
use crate::app::routes::common::{json_body, query_params};
use crate::app::services::AppServices;
use crate::middleware::SessionCredential;

/// POST /users/invite
pub async fn invite(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    body: Result<Json<InviteRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<IssuedInvitationResponse>), ApiError> {
    let principal = services.resolver.authorize(credential.credential(), Gate::Admin).await?;
    let body = json_body(body)?;
    let request = InviteRequest::parse(&body.email, &body.role, body.message)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let now = Utc::now();
    let issued = services
        .invitations
        .invite(&principal, principal.tenant_id(), request, now)
        .await?;
    Ok((StatusCode::CREATED, Json(IssuedInvitationResponse::at(&issued, now))))
}

/// GET /users/accept-invite?token= - public preview of a pending invitation.
pub async fn preview_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<InvitationPreview>, ApiError> {
    let TokenQuery { token } = query_params(query)?;
    Ok(Json(services.invitations.validate_token(&token, Utc::now()).await?))
}

/// POST /users/accept-invite - the caller is a signed-in account that may not
/// belong to any company yet.
pub async fn accept_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    body: Result<Json<AcceptInvitationBody>, JsonRejection>,
) -> Result<Json<InvitationResponse>, ApiError> {
    let account = services.resolver.resolve_account(credential.credential()).await?;
    let body = json_body(body)?;
    let now = Utc::now();
    let accepted = services.invitations.accept(&account, &body.token, now).await?;
    Ok(Json(InvitationResponse::at(&accepted, now)))
}

/// GET /users/invitations
pub async fn list_pending(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
) -> Result<Json<Vec<InvitationResponse>>, ApiError> {
    let principal = services.resolver.authorize(credential.credential(), Gate::Admin).await?;
    let now = Utc::now();
    let pending = services
        .invitations
        .list_pending(&principal, principal.tenant_id(), now)
        .await?;
    Ok(Json(pending.iter().map(|inv| InvitationResponse::at(inv, now)).collect()))
}

/// DELETE /users/invitations?id=
pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    query: Result<Query<InvitationIdQuery>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let principal = services.resolver.authorize(credential.credential(), Gate::Admin).await?;
    let invitation_id = query_params(query)?.invitation_id()?;
    services.invitations.cancel(&principal, invitation_id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}
