//! `tenantgate-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the authorization
//! layer and its adapters (no IO, no async).

pub mod email;
pub mod error;
pub mod id;
pub mod slug;

pub use email::EmailAddress;
pub use error::{DomainError, DomainResult};
pub use id::{InvitationId, TenantId, UserId};
pub use slug::Slug;
