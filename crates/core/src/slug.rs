//! URL-safe company slugs.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

const MAX_LEN: usize = 63;

/// Lowercase ASCII slug (`[a-z0-9]+(-[a-z0-9]+)*`), globally unique per
/// company at the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a display name ("Acme Tools, Inc." -> "acme-tools-inc").
    pub fn from_name(name: &str) -> DomainResult<Self> {
        let mut out = String::with_capacity(name.len());
        let mut pending_dash = false;

        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(ch.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
            if out.len() >= MAX_LEN {
                break;
            }
        }

        out.truncate(MAX_LEN);
        let out = out.trim_end_matches('-').to_string();
        if out.is_empty() {
            return Err(DomainError::validation(
                "company name must contain at least one letter or digit",
            ));
        }
        Ok(Self(out))
    }

    /// Accept an already-formed slug (e.g. from a URL), validating its shape.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_LEN
            && raw.split('-').all(|part| {
                !part.is_empty()
                    && part
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            });
        if !valid {
            return Err(DomainError::validation("invalid slug"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Slug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_from_display_name() {
        assert_eq!(Slug::from_name("Acme Tools, Inc.").unwrap().as_str(), "acme-tools-inc");
        assert_eq!(Slug::from_name("  --Neur Ant 2--").unwrap().as_str(), "neur-ant-2");
    }

    #[test]
    fn rejects_names_without_alphanumerics() {
        assert!(Slug::from_name("¡¿ !!").is_err());
    }

    #[test]
    fn parse_checks_shape() {
        assert!(Slug::parse("acme-tools").is_ok());
        assert!(Slug::parse("Acme").is_err());
        assert!(Slug::parse("acme--tools").is_err());
        assert!(Slug::parse("-acme").is_err());
    }

    #[test]
    fn derived_slug_is_always_parseable() {
        let slug = Slug::from_name("Über Café 24/7").unwrap();
        assert_eq!(Slug::parse(slug.as_str()).unwrap(), slug);
    }
}
