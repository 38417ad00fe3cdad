//! Invitation notice delivery.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use tenantgate_auth::ports::{InvitationNotifier, NotifyError};
use tenantgate_core::EmailAddress;

/// Writes a log line instead of delivering anything. The accept link carries
/// the token and is never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl InvitationNotifier for TracingNotifier {
    async fn notify_invited(
        &self,
        email: &EmailAddress,
        company_name: &str,
        _accept_url: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(email = %email, company = company_name, "invitation notice (not delivered)");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct InvitationNotice<'a> {
    email: &'a str,
    company_name: &'a str,
    accept_url: &'a str,
}

/// POSTs a JSON notice to a mailer webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    http: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl InvitationNotifier for WebhookNotifier {
    async fn notify_invited(
        &self,
        email: &EmailAddress,
        company_name: &str,
        accept_url: &str,
    ) -> Result<(), NotifyError> {
        let notice = InvitationNotice {
            email: email.as_str(),
            company_name,
            accept_url,
        };
        let response = self
            .http
            .post(&self.url)
            .json(&notice)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// A delivered notice, as captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotice {
    pub email: EmailAddress,
    pub company_name: String,
    pub accept_url: String,
}

/// Test double: records notices and can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotice>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentNotice> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InvitationNotifier for RecordingNotifier {
    async fn notify_invited(
        &self,
        email: &EmailAddress,
        company_name: &str,
        accept_url: &str,
    ) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("mailer offline".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| NotifyError::Delivery("lock poisoned".to_string()))?
            .push(SentNotice {
                email: email.clone(),
                company_name: company_name.to_string(),
                accept_url: accept_url.to_string(),
            });
        Ok(())
    }
}
