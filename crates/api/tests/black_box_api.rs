use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::json;

use tenantgate_api::app::services::{AppServices, Collaborators};
use tenantgate_auth::{Company, Credential, InvitationSettings, Role, UserProfile};
use tenantgate_core::{EmailAddress, TenantId, UserId};
use tenantgate_infra::{InMemoryDirectory, RecordingNotifier, StaticSessionProvider};

const SESSION_COOKIE: &str = "sb-access-token";

struct TestServer {
    base_url: String,
    directory: Arc<InMemoryDirectory>,
    sessions: Arc<StaticSessionProvider>,
    notifier: Arc<RecordingNotifier>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let sessions = Arc::new(StaticSessionProvider::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let services = AppServices::new(
            Collaborators {
                sessions: sessions.clone(),
                profiles: directory.clone(),
                tenants: directory.clone(),
                invitations: directory.clone(),
                notifier: notifier.clone(),
            },
            InvitationSettings {
                ttl: chrono::Duration::days(7),
                accept_url: "http://app.test/auth/accept-invite".into(),
            },
            SESSION_COOKIE.to_string(),
        );

        // Same router as prod, bound to an ephemeral port.
        let app = tenantgate_api::app::build_router(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            directory,
            sessions,
            notifier,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn company(&self, name: &str) -> TenantId {
        let company = Company::register(name, Utc::now()).unwrap();
        let id = company.id;
        self.directory.insert_company(company).unwrap();
        id
    }

    /// Signed-in account; member of `tenant` at `role` when given.
    fn user(&self, email: &str, membership: Option<(TenantId, Role)>) -> (UserId, String) {
        let id = UserId::new();
        let mut profile = UserProfile::signed_up(id, email, Utc::now());
        if let Some((tenant, role)) = membership {
            profile.tenant_id = Some(tenant);
            profile.role = role;
        }
        self.directory.insert_profile(profile).unwrap();
        let credential: Credential = self
            .sessions
            .issue(id, EmailAddress::parse(email).unwrap())
            .unwrap();
        (id, credential.expose().to_string())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn token_from_link(link: &str) -> String {
    link.split("token=").nth(1).unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/auth/session", "/users/profile", "/company", "/company/users"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthenticated");
    }

    let res = client
        .get(srv.url("/auth/session"))
        .bearer_auth("forged")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_is_resolved_from_cookie_or_bearer() {
    let srv = TestServer::spawn().await;
    let tenant = srv.company("Acme");
    let (id, token) = srv.user("sup@acme.io", Some((tenant, Role::Supervisor)));
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/auth/session"))
        .header("Cookie", format!("{SESSION_COOKIE}={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user"]["id"], id.to_string());
    assert_eq!(body["user"]["role"], "supervisor");
    assert_eq!(body["company"]["id"], tenant.to_string());
    assert_eq!(body["company"]["slug"], "acme");

    let res = client
        .post(srv.url("/auth/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/users/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let profile: serde_json::Value = res.json().await.unwrap();
    assert!(profile["last_login_at"].is_string());
}

#[tokio::test]
async fn sign_out_revokes_the_session() {
    let srv = TestServer::spawn().await;
    let tenant = srv.company("Acme");
    let (_, token) = srv.user("op@acme.io", Some((tenant, Role::Operator)));
    let client = reqwest::Client::new();

    let res = client.post(srv.url("/auth/signout")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.get(srv.url("/auth/session")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invitation_lifecycle_over_http() {
    let srv = TestServer::spawn().await;
    let t1 = srv.company("Acme");
    let (_, admin) = srv.user("a@acme.io", Some((t1, Role::Admin)));
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/users/invite"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "bob@x.com", "role": "supervisor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["invitation"]["state"], "pending");
    assert_eq!(body["invitation"]["role"], "supervisor");
    assert_eq!(body["notification"]["status"], "sent");
    assert!(body["invitation"].get("token").is_none());

    // Same address again while pending.
    let res = client
        .post(srv.url("/users/invite"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "bob@x.com", "role": "operator" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let token = token_from_link(&srv.notifier.sent()[0].accept_url);

    let res = client
        .get(srv.url(&format!("/users/accept-invite?token={token}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let preview: serde_json::Value = res.json().await.unwrap();
    assert_eq!(preview["company"]["name"], "Acme");
    assert_eq!(preview["email"], "bob@x.com");

    let (bob_id, bob) = srv.user("bob@x.com", None);
    let res = client
        .post(srv.url("/users/accept-invite"))
        .bearer_auth(&bob)
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/auth/session")).bearer_auth(&bob).send().await.unwrap();
    let session: serde_json::Value = res.json().await.unwrap();
    assert_eq!(session["user"]["id"], bob_id.to_string());
    assert_eq!(session["user"]["role"], "supervisor");
    assert_eq!(session["company"]["id"], t1.to_string());

    let res = client
        .post(srv.url("/users/accept-invite"))
        .bearer_auth(&bob)
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url(&format!("/users/accept-invite?token={token}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_is_idempotent_and_tenant_scoped() {
    let srv = TestServer::spawn().await;
    let t1 = srv.company("Acme");
    let t2 = srv.company("Globex");
    let (_, admin1) = srv.user("a@acme.io", Some((t1, Role::Admin)));
    let (_, admin2) = srv.user("a@globex.io", Some((t2, Role::Admin)));
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/users/invite"))
        .bearer_auth(&admin2)
        .json(&json!({ "email": "bob@x.com", "role": "operator" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let id = body["invitation"]["id"].as_str().unwrap().to_string();

    let res = client
        .delete(srv.url(&format!("/users/invitations?id={id}")))
        .bearer_auth(&admin1)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "access denied");

    for _ in 0..2 {
        let res = client
            .delete(srv.url(&format!("/users/invitations?id={id}")))
            .bearer_auth(&admin2)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    let res = client.get(srv.url("/users/invitations")).bearer_auth(&admin2).send().await.unwrap();
    let pending: serde_json::Value = res.json().await.unwrap();
    assert!(pending.as_array().unwrap().is_empty());

    let res = client
        .delete(srv.url("/users/invitations?id=not-a-uuid"))
        .bearer_auth(&admin2)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn operator_is_forbidden_from_admin_endpoints_and_nothing_changes() {
    let srv = TestServer::spawn().await;
    let t1 = srv.company("Acme");
    let (_, op) = srv.user("op@acme.io", Some((t1, Role::Operator)));
    let (peer, _) = srv.user("peer@acme.io", Some((t1, Role::Operator)));
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/users/invite"))
        .bearer_auth(&op)
        .json(&json!({ "email": "bob@x.com", "role": "operator" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.get(srv.url("/company/users")).bearer_auth(&op).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(srv.url(&format!("/company/users/{peer}")))
        .bearer_auth(&op)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(srv.url("/company"))
        .bearer_auth(&op)
        .json(&json!({ "name": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert!(srv.notifier.sent().is_empty());
    let res = client.get(srv.url("/company")).bearer_auth(&op).send().await.unwrap();
    let company: serde_json::Value = res.json().await.unwrap();
    assert_eq!(company["name"], "Acme");
}

#[tokio::test]
async fn self_targeting_is_a_bad_request_for_every_role() {
    let srv = TestServer::spawn().await;
    let t1 = srv.company("Acme");
    let client = reqwest::Client::new();

    for role in [Role::Owner, Role::Operator] {
        let (id, token) = srv.user(&format!("{role}@acme.io"), Some((t1, role)));

        let res = client
            .put(srv.url(&format!("/company/users/{id}")))
            .bearer_auth(&token)
            .json(&json!({ "role": "supervisor" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["message"], "cannot modify own role");

        let res = client
            .delete(srv.url(&format!("/company/users/{id}")))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn admin_manages_members_of_own_tenant_only() {
    let srv = TestServer::spawn().await;
    let t1 = srv.company("Acme");
    let t2 = srv.company("Globex");
    let (_, admin) = srv.user("a@acme.io", Some((t1, Role::Admin)));
    let (member, member_token) = srv.user("m@acme.io", Some((t1, Role::Operator)));
    let (stranger, _) = srv.user("s@globex.io", Some((t2, Role::Operator)));
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/company/users?limit=1"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let page: serde_json::Value = res.json().await.unwrap();
    assert_eq!(page["total"], 2);
    assert_eq!(page["has_more"], true);

    let res = client
        .put(srv.url(&format!("/company/users/{member}")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "supervisor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["role"], "supervisor");

    let res = client
        .get(srv.url(&format!("/company/users/{stranger}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(srv.url(&format!("/company/users/{}", UserId::new())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/company/users/{member}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/auth/session"))
        .bearer_auth(&member_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn founding_a_company_makes_the_caller_owner() {
    let srv = TestServer::spawn().await;
    let (_, founder) = srv.user("founder@x.io", None);
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/auth/session")).bearer_auth(&founder).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/company"))
        .bearer_auth(&founder)
        .json(&json!({ "name": "Initech Labs" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let company: serde_json::Value = res.json().await.unwrap();
    assert_eq!(company["slug"], "initech-labs");

    let res = client.get(srv.url("/auth/session")).bearer_auth(&founder).send().await.unwrap();
    let session: serde_json::Value = res.json().await.unwrap();
    assert_eq!(session["user"]["role"], "owner");

    let res = client
        .put(srv.url("/company"))
        .bearer_auth(&founder)
        .json(&json!({ "logo_url": "https://cdn.initech.io/logo.png", "domain": "Initech.io" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let company: serde_json::Value = res.json().await.unwrap();
    assert_eq!(company["domain"], "initech.io");

    let res = client.delete(srv.url("/company")).bearer_auth(&founder).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let company: serde_json::Value = res.json().await.unwrap();
    assert_eq!(company["is_active"], false);

    let res = client.get(srv.url("/company")).bearer_auth(&founder).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bodies_use_the_error_shape() {
    let srv = TestServer::spawn().await;
    let t1 = srv.company("Acme");
    let (_, admin) = srv.user("a@acme.io", Some((t1, Role::Admin)));
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/users/invite"))
        .bearer_auth(&admin)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    let res = client
        .post(srv.url("/users/invite"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "bob@x.com", "role": "owner" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
