use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use tenantgate_auth::{AccessError, ErrorKind};

/// Handler error: either an authorization-layer outcome or an unexpected fault.
#[derive(Debug)]
pub enum ApiError {
    Access(AccessError),
    Internal(anyhow::Error),
}

impl From<AccessError> for ApiError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Access(AccessError::bad_request(msg))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Access(err) => {
                let kind = err.kind();
                let message = match err {
                    AccessError::Unauthenticated => "authentication required".to_string(),
                    // Never say which check failed.
                    AccessError::Forbidden => "access denied".to_string(),
                    AccessError::Upstream(detail) => {
                        tracing::error!(error = %detail, "upstream collaborator failed");
                        "upstream service unavailable".to_string()
                    }
                    AccessError::BadRequest(msg)
                    | AccessError::Conflict(msg)
                    | AccessError::NotFound(msg) => msg,
                };
                json_error(status_for(kind), kind.as_str(), message)
            }
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "unhandled internal error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal server error")
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
