//! Hosted (GoTrue-compatible) auth provider client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use tenantgate_auth::ports::{SessionError, SessionProvider};
use tenantgate_auth::{Credential, RawIdentity};
use tenantgate_core::{EmailAddress, UserId};

#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,

    /// Public (anon) API key sent as `apikey`.
    pub anon_key: String,
}

/// Validates access tokens by asking the provider who they belong to.
#[derive(Debug, Clone)]
pub struct GoTrueSessionProvider {
    config: GoTrueConfig,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: uuid::Uuid,
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
}

impl GoTrueSessionProvider {
    pub fn new(config: GoTrueConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl SessionProvider for GoTrueSessionProvider {
    async fn validate_credential(&self, credential: &Credential) -> Result<RawIdentity, SessionError> {
        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                return Err(SessionError::Rejected);
            }
            status => {
                return Err(SessionError::Unavailable(format!(
                    "user lookup failed with status {status}"
                )));
            }
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| SessionError::Unavailable(format!("unexpected user payload: {e}")))?;

        // A session without a confirmed address cannot be matched to invitations.
        if user.email_confirmed_at.is_none() {
            tracing::warn!(user_id = %user.id, "session rejected: email not confirmed");
            return Err(SessionError::Rejected);
        }
        let email = user.email.ok_or(SessionError::Rejected)?;
        let verified_email = EmailAddress::parse(&email).map_err(|_| SessionError::Rejected)?;

        Ok(RawIdentity {
            user_id: UserId::from_uuid(user.id),
            verified_email,
        })
    }

    async fn invalidate(&self, credential: &Credential) -> Result<(), SessionError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SessionError::Rejected),
            status => Err(SessionError::Unavailable(format!(
                "logout failed with status {status}"
            ))),
        }
    }
}
