//! Request credential extraction.
//!
//! The extractor only pulls the opaque token out of the request; resolution
//! and gating happen in handlers through the resolver, which returns the
//! principal explicitly.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::CookieJar;

use tenantgate_auth::Credential;

use crate::app::services::AppServices;

/// The caller's session credential, if any. Never rejects: a missing
/// credential is reported as `Unauthenticated` by the gate.
#[derive(Debug, Clone, Default)]
pub struct SessionCredential(pub Option<Credential>);

impl SessionCredential {
    pub fn credential(&self) -> Option<&Credential> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionCredential
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let cookie_name = parts
            .extensions
            .get::<Arc<AppServices>>()
            .map(|services| services.session_cookie.clone());

        Ok(Self(extract_credential(&parts.headers, cookie_name.as_deref())))
    }
}

/// `Authorization: Bearer` wins over the session cookie.
pub fn extract_credential(headers: &HeaderMap, cookie_name: Option<&str>) -> Option<Credential> {
    if let Some(token) = extract_bearer(headers) {
        return Credential::new(token);
    }
    let jar = CookieJar::from_headers(headers);
    cookie_name
        .and_then(|name| jar.get(name))
        .and_then(|cookie| Credential::new(cookie.value()))
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_is_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=cookie"));

        let credential = extract_credential(&headers, Some("sb-access-token")).unwrap();
        assert_eq!(credential.expose(), "abc");
    }

    #[test]
    fn falls_back_to_the_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("other=1; sb-access-token=tok"));

        let credential = extract_credential(&headers, Some("sb-access-token")).unwrap();
        assert_eq!(credential.expose(), "tok");
    }

    #[test]
    fn blank_or_malformed_credentials_are_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_credential(&headers, Some("sb-access-token")).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token="));
        assert!(extract_credential(&headers, Some("sb-access-token")).is_none());
    }
}
