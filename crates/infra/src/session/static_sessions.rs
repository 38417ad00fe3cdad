use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rand::RngCore;

use tenantgate_auth::ports::{SessionError, SessionProvider};
use tenantgate_auth::{Credential, RawIdentity};
use tenantgate_core::{EmailAddress, UserId};

/// Session provider backed by an in-process token table.
///
/// Intended for tests/dev, where no hosted auth provider is configured.
#[derive(Debug, Default)]
pub struct StaticSessionProvider {
    sessions: RwLock<HashMap<String, RawIdentity>>,
}

impl StaticSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `user_id` and return its credential.
    pub fn issue(&self, user_id: UserId, email: EmailAddress) -> Result<Credential, SessionError> {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        self.insert(token.clone(), user_id, email)?;
        Credential::new(token).ok_or(SessionError::Rejected)
    }

    /// Register a known token (fixtures, dev seeding).
    pub fn insert(
        &self,
        token: impl Into<String>,
        user_id: UserId,
        email: EmailAddress,
    ) -> Result<(), SessionError> {
        self.sessions
            .write()
            .map_err(|_| SessionError::Unavailable("lock poisoned".to_string()))?
            .insert(
                token.into(),
                RawIdentity {
                    user_id,
                    verified_email: email,
                },
            );
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn validate_credential(&self, credential: &Credential) -> Result<RawIdentity, SessionError> {
        self.sessions
            .read()
            .map_err(|_| SessionError::Unavailable("lock poisoned".to_string()))?
            .get(credential.expose())
            .cloned()
            .ok_or(SessionError::Rejected)
    }

    async fn invalidate(&self, credential: &Credential) -> Result<(), SessionError> {
        self.sessions
            .write()
            .map_err(|_| SessionError::Unavailable("lock poisoned".to_string()))?
            .remove(credential.expose())
            .map(|_| ())
            .ok_or(SessionError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_session_validates_until_invalidated() {
        let provider = StaticSessionProvider::new();
        let user = UserId::new();
        let email = EmailAddress::parse("a@x.io").unwrap();
        let credential = provider.issue(user, email.clone()).unwrap();

        let identity = provider.validate_credential(&credential).await.unwrap();
        assert_eq!(identity.user_id, user);
        assert_eq!(identity.verified_email, email);

        provider.invalidate(&credential).await.unwrap();
        assert_eq!(
            provider.validate_credential(&credential).await.unwrap_err(),
            SessionError::Rejected
        );
    }
}
