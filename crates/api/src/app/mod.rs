//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: adapter selection and service construction
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::config::AppConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration (public entrypoint used by `main.rs`).
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(cfg).await?;
    Ok(build_router(services))
}

/// Router over already-wired services (tests inject in-memory collaborators).
pub fn build_router(services: services::AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(Arc::new(services))))
}
