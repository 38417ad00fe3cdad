//! Member administration under `/company/users`.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;

use tenantgate_auth::{Gate, MemberPage, MemberQuery, UserProfile};

use crate::app::dto::{MemberListParams, MemberUpdateBody};
use crate::app::errors::ApiError;
use crate::app::routes::common::{json_body, parse_user_id, query_params};
use crate::app::services::AppServices;
use crate::middleware::SessionCredential;

/// GET /company/users?search=&page=&limit=
pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    query: Result<Query<MemberListParams>, QueryRejection>,
) -> Result<Json<MemberPage>, ApiError> {
    let principal = services.resolver.authorize(credential.credential(), Gate::Admin).await?;
    let query = MemberQuery::from(query_params(query)?);
    Ok(Json(services.members.list_members(&principal, &query).await?))
}

/// GET /company/users/:id
pub async fn member(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let principal = services.resolver.authorize(credential.credential(), Gate::Supervisor).await?;
    let user_id = parse_user_id(&id)?;
    Ok(Json(services.members.member(&principal, user_id).await?))
}

/// PUT /company/users/:id
///
/// Gated on authentication only: the service rejects self-targeting before
/// it checks for admin, so the answer to "change my own role" is the same
/// for every role.
pub async fn update_member(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    Path(id): Path<String>,
    body: Result<Json<MemberUpdateBody>, JsonRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let principal = services.resolver.authorize_any(credential.credential()).await?;
    let user_id = parse_user_id(&id)?;
    let update = json_body(body)?.into_update()?;
    Ok(Json(services.members.update_member(&principal, user_id, update).await?))
}

/// DELETE /company/users/:id - soft removal.
pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = services.resolver.authorize_any(credential.credential()).await?;
    let user_id = parse_user_id(&id)?;
    services.members.remove_member(&principal, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
