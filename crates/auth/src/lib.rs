//! `tenantgate-auth`: role-based access control and tenant isolation.
//!
//! This crate is decoupled from HTTP and storage: collaborators are reached
//! through the async traits in [`ports`], injected at construction.

pub mod authorize;
pub mod company;
pub mod error;
pub mod invitation;
pub mod invitations;
pub mod membership;
pub mod ports;
pub mod principal;
pub mod profile;
pub mod resolver;
pub mod roles;
pub mod tenant;

pub use authorize::{
    Action, Gate, Resource, SelfTargeted, can_perform, ensure_not_self, ensure_same_tenant,
    require_role, same_tenant,
};
pub use company::CompanyService;
pub use error::{AccessError, AccessResult, ErrorKind};
pub use invitation::{
    CompanyPreview, DEFAULT_INVITATION_TTL_HOURS, Invitation, InvitationPreview, InvitationState,
    InvitationToken, InviteRequest, MAX_INVITATION_TTL_HOURS,
};
pub use invitations::{InvitationService, InvitationSettings, IssuedInvitation, NotificationStatus};
pub use membership::{MemberPage, MemberQuery, MembershipService};
pub use principal::{Account, Credential, Principal, RawIdentity, UnusableProfile};
pub use profile::{MemberUpdate, ProfilePatch, UserProfile};
pub use resolver::IdentityResolver;
pub use roles::{Role, dominates};
pub use tenant::{Company, CompanyPatch, CompanySummary};
