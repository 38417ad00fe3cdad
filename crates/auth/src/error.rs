//! Error taxonomy of the authorization layer.

use serde::Serialize;
use thiserror::Error;

use tenantgate_core::DomainError;

use crate::ports::{SessionError, StoreError};

pub type AccessResult<T> = Result<T, AccessError>;

/// Failure of an authorization-layer operation.
///
/// Every operation exposed to handlers fails with exactly one of these kinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No usable credential, or the credential resolves to an inactive or
    /// tenant-less profile.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but insufficient role or a tenant mismatch.
    #[error("access denied")]
    Forbidden,

    /// Malformed input, disallowed self-targeting, or a data-integrity fault.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Duplicate invitation, duplicate slug, email already a member.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unknown resource (including non-pending invitation tokens).
    #[error("not found: {0}")]
    NotFound(String),

    /// External collaborator failure; safe to retry.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl AccessError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AccessError::Unauthenticated => ErrorKind::Unauthenticated,
            AccessError::Forbidden => ErrorKind::Forbidden,
            AccessError::BadRequest(_) => ErrorKind::BadRequest,
            AccessError::Conflict(_) => ErrorKind::Conflict,
            AccessError::NotFound(_) => ErrorKind::NotFound,
            AccessError::Upstream(_) => ErrorKind::Upstream,
        }
    }
}

/// Stable, serializable error kind (used as the `error` code on the wire).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    BadRequest,
    Conflict,
    NotFound,
    Upstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Upstream => "upstream",
        }
    }
}

impl From<DomainError> for AccessError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::BadRequest(msg),
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Integrity(msg) => Self::BadRequest(msg),
            StoreError::Unavailable(msg) => Self::Upstream(msg),
        }
    }
}

impl From<SessionError> for AccessError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::Rejected => Self::Unauthenticated,
            SessionError::Unavailable(msg) => Self::Upstream(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_not_masked_as_business_errors() {
        let err: AccessError = StoreError::Unavailable("connection reset".into()).into();
        assert_eq!(err.kind(), ErrorKind::Upstream);

        let err: AccessError = StoreError::Conflict("slug taken".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn forbidden_message_carries_no_detail() {
        assert_eq!(AccessError::Forbidden.to_string(), "access denied");
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err: AccessError = DomainError::validation("invalid email address").into();
        assert_eq!(err, AccessError::BadRequest("invalid email address".into()));
    }
}
