use std::sync::Arc;

use axum::extract::Extension;
use axum::extract::rejection::JsonRejection;
use axum::Json;

use tenantgate_auth::{ProfilePatch, UserProfile};

use crate::app::dto::ProfileUpdateBody;
use crate::app::errors::ApiError;
use crate::app::routes::common::json_body;
use crate::app::services::AppServices;
use crate::middleware::SessionCredential;

/// GET /users/profile
pub async fn own_profile(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
) -> Result<Json<UserProfile>, ApiError> {
    let principal = services.resolver.authorize_any(credential.credential()).await?;
    Ok(Json(services.members.own_profile(&principal).await?))
}

/// PUT /users/profile - self-service; the target is always the caller.
pub async fn update_own_profile(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    body: Result<Json<ProfileUpdateBody>, JsonRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let principal = services.resolver.authorize_any(credential.credential()).await?;
    let patch = ProfilePatch::from(json_body(body)?);
    Ok(Json(services.members.update_own_profile(&principal, &patch).await?))
}
