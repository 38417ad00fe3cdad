//! Normalized e-mail address value object.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

const MAX_LEN: usize = 254;

/// An e-mail address, trimmed and lower-cased on construction.
///
/// Invitations and membership checks compare addresses through this type, so
/// `Bob@X.com` and `bob@x.com` are the same member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();

        if normalized.is_empty() || normalized.len() > MAX_LEN {
            return Err(DomainError::validation("invalid email address"));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("invalid email address"));
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(DomainError::validation("invalid email address"));
        };
        if local.is_empty() || domain.contains('@') {
            return Err(DomainError::validation("invalid email address"));
        }
        let labels_ok = domain.contains('.')
            && domain.split('.').all(|label| !label.is_empty());
        if !labels_ok {
            return Err(DomainError::validation("invalid email address"));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against an address stored elsewhere.
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other.trim().to_lowercase()
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EmailAddress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let email = EmailAddress::parse("  Bob@X.com ").unwrap();
        assert_eq!(email.as_str(), "bob@x.com");
        assert!(email.matches("BOB@x.COM"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in ["", "bob", "@x.com", "bob@", "bob@x", "bob@@x.com", "bo b@x.com", "bob@x..com"] {
            assert!(EmailAddress::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: EmailAddress = serde_json::from_str("\"Alice@Example.org\"").unwrap();
        assert_eq!(ok.as_str(), "alice@example.org");
        assert!(serde_json::from_str::<EmailAddress>("\"nope\"").is_err());
    }
}
