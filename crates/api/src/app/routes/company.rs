//! Company endpoints: the caller's own tenant only.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use tenantgate_auth::{Company, CompanyPatch, Gate};

use crate::app::dto::{CompanyUpdateBody, RegisterCompanyBody};
use crate::app::errors::ApiError;
use crate::app::routes::common::json_body;
use crate::app::services::AppServices;
use crate::middleware::SessionCredential;

/// GET /company
pub async fn company(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
) -> Result<Json<Company>, ApiError> {
    let principal = services.resolver.authorize_any(credential.credential()).await?;
    Ok(Json(services.companies.company(&principal).await?))
}

/// PUT /company
pub async fn update_company(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    body: Result<Json<CompanyUpdateBody>, JsonRejection>,
) -> Result<Json<Company>, ApiError> {
    let principal = services.resolver.authorize(credential.credential(), Gate::Admin).await?;
    let patch = CompanyPatch::from(json_body(body)?);
    Ok(Json(services.companies.update_company(&principal, &patch, Utc::now()).await?))
}

/// POST /company - onboarding: a signed-in account without a company founds one.
pub async fn register_company(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
    body: Result<Json<RegisterCompanyBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    let account = services.resolver.resolve_account(credential.credential()).await?;
    let body = json_body(body)?;
    let company = services
        .companies
        .register_company(&account, &body.name, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// DELETE /company - soft deactivation, owner only.
pub async fn deactivate_company(
    Extension(services): Extension<Arc<AppServices>>,
    credential: SessionCredential,
) -> Result<Json<Company>, ApiError> {
    let principal = services.resolver.authorize(credential.credential(), Gate::Owner).await?;
    Ok(Json(services.companies.deactivate_company(&principal, Utc::now()).await?))
}
