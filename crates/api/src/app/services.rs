//! Service wiring: picks adapters from configuration and builds the
//! resolver and services every handler receives.

use std::sync::Arc;

use tenantgate_auth::ports::{
    InvitationNotifier, InvitationStore, ProfileStore, SessionProvider, TenantStore,
};
use tenantgate_auth::{
    CompanyService, IdentityResolver, InvitationService, InvitationSettings, MembershipService,
};
use tenantgate_infra::{
    GoTrueConfig, GoTrueSessionProvider, InMemoryDirectory, PostgresDirectory,
    StaticSessionProvider, TracingNotifier, WebhookNotifier,
};

use crate::config::AppConfig;

/// Everything a handler may need. Shared read-only across requests.
#[derive(Clone)]
pub struct AppServices {
    pub resolver: IdentityResolver,
    pub invitations: InvitationService,
    pub members: MembershipService,
    pub companies: CompanyService,
    pub session_cookie: String,
}

/// Adapter set behind the services.
#[derive(Clone)]
pub struct Collaborators {
    pub sessions: Arc<dyn SessionProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub tenants: Arc<dyn TenantStore>,
    pub invitations: Arc<dyn InvitationStore>,
    pub notifier: Arc<dyn InvitationNotifier>,
}

impl AppServices {
    pub fn new(collaborators: Collaborators, settings: InvitationSettings, session_cookie: String) -> Self {
        let Collaborators {
            sessions,
            profiles,
            tenants,
            invitations,
            notifier,
        } = collaborators;

        Self {
            resolver: IdentityResolver::new(sessions, profiles.clone(), tenants.clone()),
            invitations: InvitationService::new(
                profiles.clone(),
                tenants.clone(),
                invitations,
                notifier,
                settings,
            ),
            members: MembershipService::new(profiles),
            companies: CompanyService::new(tenants),
            session_cookie,
        }
    }
}

/// Build services from configuration (Postgres + hosted auth in production,
/// in-memory fallbacks otherwise).
pub async fn build_services(cfg: &AppConfig) -> anyhow::Result<AppServices> {
    let (profiles, tenants, invitations) = match cfg.database_url.as_deref() {
        Some(url) => {
            tracing::info!("using postgres directory");
            directory_ports(Arc::new(PostgresDirectory::connect(url).await?))
        }
        None => {
            tracing::warn!("database_url not set; using in-memory directory");
            directory_ports(Arc::new(InMemoryDirectory::new()))
        }
    };

    let sessions: Arc<dyn SessionProvider> = match &cfg.auth {
        Some(auth) => Arc::new(GoTrueSessionProvider::new(GoTrueConfig {
            url: auth.url.clone(),
            anon_key: auth.anon_key.clone(),
        })),
        None => {
            tracing::warn!("auth provider not configured; using static dev sessions");
            Arc::new(StaticSessionProvider::new())
        }
    };

    let notifier: Arc<dyn InvitationNotifier> = match cfg.notify_webhook_url.as_deref() {
        Some(url) => Arc::new(WebhookNotifier::new(url)),
        None => Arc::new(TracingNotifier),
    };

    let settings = InvitationSettings {
        ttl: cfg.invitation_ttl(),
        accept_url: cfg.accept_invite_url(),
    };

    Ok(AppServices::new(
        Collaborators {
            sessions,
            profiles,
            tenants,
            invitations,
            notifier,
        },
        settings,
        cfg.session_cookie.clone(),
    ))
}

type DirectoryPorts = (
    Arc<dyn ProfileStore>,
    Arc<dyn TenantStore>,
    Arc<dyn InvitationStore>,
);

fn directory_ports<D>(directory: Arc<D>) -> DirectoryPorts
where
    D: ProfileStore + TenantStore + InvitationStore + 'static,
{
    (directory.clone(), directory.clone(), directory)
}
