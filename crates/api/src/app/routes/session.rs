//! Session inspection and sign-out. Sign-in itself happens at the hosted
//! auth provider; the client then presents the provider's access token.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::app::dto::SessionResponse;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::SessionCredential;

/// GET /auth/session
pub async fn current_session(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
) -> Result<Json<SessionResponse>, ApiError> {
    let principal = services.resolver.authorize_any(credential.credential()).await?;
    Ok(Json(SessionResponse::from(&principal)))
}

/// POST /auth/session - called by the client right after provider sign-in.
pub async fn start_session(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
) -> Result<Json<SessionResponse>, ApiError> {
    let principal = services.resolver.authorize_any(credential.credential()).await?;
    services.members.record_login(&principal, Utc::now()).await?;
    tracing::info!(user_id = %principal.id(), tenant_id = %principal.tenant_id(), "session started");
    Ok(Json(SessionResponse::from(&principal)))
}

/// POST /auth/signout
pub async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
) -> Result<StatusCode, ApiError> {
    services.resolver.sign_out(credential.credential()).await?;
    Ok(StatusCode::NO_CONTENT)
}
