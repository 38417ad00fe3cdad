use axum::routing::{get, post};
use axum::Router;

pub mod common;
pub mod company;
pub mod invitations;
pub mod members;
pub mod profile;
pub mod session;
pub mod system;

/// Router for every endpoint that looks at a credential. Gating happens in
/// each handler, which receives the principal from the resolver.
pub fn router() -> Router {
    Router::new()
        .route(
            "/auth/session",
            get(session::current_session).post(session::start_session),
        )
        .route("/auth/signout", post(session::sign_out))
        .route(
            "/users/profile",
            get(profile::own_profile).put(profile::update_own_profile),
        )
        .route("/users/invite", post(invitations::invite))
        .route(
            "/users/accept-invite",
            get(invitations::preview_invitation).post(invitations::accept_invitation),
        )
        .route(
            "/users/invitations",
            get(invitations::list_pending).delete(invitations::cancel),
        )
        .route(
            "/company",
            get(company::company)
                .put(company::update_company)
                .post(company::register_company)
                .delete(company::deactivate_company),
        )
        .route("/company/users", get(members::list_members))
        .route(
            "/company/users/:id",
            get(members::member)
                .put(members::update_member)
                .delete(members::remove_member),
        )
}
