//! Service configuration: `tenantgate.toml` (optional) overlaid with
//! `TENANTGATE__*` environment variables.

use serde::Deserialize;

use tenantgate_auth::{DEFAULT_INVITATION_TTL_HOURS, MAX_INVITATION_TTL_HOURS};
use tenantgate_observability::LogFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_COOKIE: &str = "sb-access-token";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Public base URL of the web app; invitation links point at
    /// `{app_url}/auth/accept-invite`.
    #[serde(default = "default_app_url")]
    pub app_url: String,

    /// Cookie carrying the hosted provider's access token.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_invitation_ttl_hours")]
    pub invitation_ttl_hours: i64,

    /// Absent: in-memory directory (dev/test only).
    #[serde(default)]
    pub database_url: Option<String>,

    /// Absent: static in-process sessions (dev/test only).
    #[serde(default)]
    pub auth: Option<AuthProviderSettings>,

    /// Absent: invitation notices are only logged.
    #[serde(default)]
    pub notify_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthProviderSettings {
    pub url: String,
    pub anon_key: String,
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_session_cookie() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

fn default_invitation_ttl_hours() -> i64 {
    DEFAULT_INVITATION_TTL_HOURS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            app_url: default_app_url(),
            session_cookie: default_session_cookie(),
            log_format: LogFormat::default(),
            invitation_ttl_hours: default_invitation_ttl_hours(),
            database_url: None,
            auth: None,
            notify_webhook_url: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present), then `tenantgate.toml` (if present), then
    /// the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("tenantgate").required(false))
            .add_source(
                config::Environment::with_prefix("TENANTGATE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(1..=MAX_INVITATION_TTL_HOURS).contains(&self.invitation_ttl_hours) {
            return Err(config::ConfigError::Message(format!(
                "invitation_ttl_hours must be between 1 and {MAX_INVITATION_TTL_HOURS}"
            )));
        }
        if self.session_cookie.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "session_cookie must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn invitation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.invitation_ttl_hours)
    }

    pub fn accept_invite_url(&self) -> String {
        format!("{}/auth/accept-invite", self.app_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.session_cookie, "sb-access-token");
        assert_eq!(cfg.invitation_ttl(), chrono::Duration::days(7));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn accept_url_is_built_from_app_url() {
        let cfg = AppConfig {
            app_url: "https://app.example.com/".into(),
            ..AppConfig::default()
        };
        assert_eq!(cfg.accept_invite_url(), "https://app.example.com/auth/accept-invite");
    }

    #[test]
    fn deserializes_partial_sources_with_defaults() {
        let settings = config::Config::builder()
            .set_override("invitation_ttl_hours", 24)
            .unwrap()
            .set_override("log_format", "compact")
            .unwrap()
            .build()
            .unwrap();
        let cfg: AppConfig = settings.try_deserialize().unwrap();
        assert_eq!(cfg.invitation_ttl_hours, 24);
        assert_eq!(cfg.log_format, LogFormat::Compact);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        let cfg = AppConfig {
            invitation_ttl_hours: 0,
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_ttl_is_rejected() {
        let cfg = AppConfig {
            invitation_ttl_hours: 3_000_000_000,
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());

        let year = AppConfig {
            invitation_ttl_hours: MAX_INVITATION_TTL_HOURS,
            ..AppConfig::default()
        };
        assert!(year.validate().is_ok());
    }
}
