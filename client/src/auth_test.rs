use super::*;
use crate::session::{MemorySessionStore, SessionStore};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use models::Role;
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOW: i64 = 1_700_000_000;

fn token_expiring_at(exp: i64) -> String {
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"exp": exp})).unwrap());
    format!("h.{body}.s")
}

fn user_json(role: &str) -> serde_json::Value {
    json!({
        "id": "6f1c2b9e-0000-4000-8000-000000000001",
        "name": "Ada",
        "email": "ada@example.com",
        "role": role,
        "created_at": "2025-01-01T00:00:00Z"
    })
}

fn stale_user() -> User {
    User {
        id: Uuid::new_v4(),
        name: "Old".into(),
        email: "ada@example.com".into(),
        role: Role::Member,
        picture: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

fn context(server: &MockServer, session: Session) -> (AuthContext, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new(session));
    let api = ApiClient::new(&server.uri(), store.clone()).unwrap();
    (AuthContext::new(api), store)
}

fn auth_body(token: &str, role: &str) -> serde_json::Value {
    json!({"access_token": token, "token_type": "bearer", "user": user_json(role)})
}

#[tokio::test]
async fn login_stores_token_and_user() {
    let server = MockServer::start().await;
    let token = token_expiring_at(NOW + 3_600);
    Mock::given(method("POST"))
        .and(path("/auth/password-login"))
        .and(body_string_contains("ada@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(&token, "admin")))
        .mount(&server)
        .await;

    let (auth, store) = context(&server, Session::default());
    let user = auth.login("ada@example.com", "hunter22").await.unwrap();
    assert_eq!(user.role, Role::Admin);

    let session = store.load().unwrap();
    assert_eq!(session.token.as_deref(), Some(token.as_str()));
    assert!(session.is_logged_in(NOW));
}

#[tokio::test]
async fn failed_login_leaves_session_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/password-login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "invalid email or password"})))
        .mount(&server)
        .await;

    let (auth, store) = context(&server, Session::default());
    let err = auth.login("ada@example.com", "nope").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(store.load().unwrap().is_empty());
}

#[tokio::test]
async fn register_signs_in_afterwards() {
    let server = MockServer::start().await;
    let token = token_expiring_at(NOW + 3_600);
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(user_json("member")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/password-login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(&token, "member")))
        .expect(1)
        .mount(&server)
        .await;

    let (auth, store) = context(&server, Session::default());
    let user = auth.register("Ada", "ada@example.com", "hunter22").await.unwrap();
    assert_eq!(user.role, Role::Member);
    assert!(store.load().unwrap().is_logged_in(NOW));
}

#[tokio::test]
async fn google_flow_returns_url_then_stores_session() {
    let server = MockServer::start().await;
    let token = token_expiring_at(NOW + 3_600);
    Mock::given(method("GET"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"auth_url": "https://accounts.google.com/o?state=s"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/callback"))
        .and(query_param("code", "c0de"))
        .and(query_param("state", "s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(&token, "core_member")))
        .mount(&server)
        .await;

    let (auth, store) = context(&server, Session::default());
    let url = auth.google_login_url(None).await.unwrap();
    assert!(url.starts_with("https://accounts.google.com/"));

    let user = auth.complete_google_login("c0de", "s").await.unwrap();
    assert_eq!(user.role, Role::CoreMember);
    assert_eq!(store.load().unwrap().token.as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (auth, store) = context(&server, Session::new(token_expiring_at(NOW + 60), stale_user()));
    auth.logout().await.unwrap();
    assert!(store.load().unwrap().is_empty());
}

#[tokio::test]
async fn restore_without_token_is_anonymous() {
    let server = MockServer::start().await;
    let (auth, _) = context(&server, Session::default());
    assert_eq!(auth.restore(NOW).await.unwrap(), AuthStatus::Anonymous);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn restore_with_expired_token_clears_without_request() {
    let server = MockServer::start().await;
    let (auth, store) = context(&server, Session::new(token_expiring_at(NOW - 1), stale_user()));

    assert_eq!(auth.restore(NOW).await.unwrap(), AuthStatus::Anonymous);
    assert!(store.load().unwrap().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn restore_refreshes_user_from_server() {
    let server = MockServer::start().await;
    let token = token_expiring_at(NOW + 600);
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("core_member")))
        .mount(&server)
        .await;

    let (auth, store) = context(&server, Session::new(token.clone(), stale_user()));
    let status = auth.restore(NOW).await.unwrap();
    assert_eq!(status.user().map(|u| u.role), Some(Role::CoreMember));

    let session = store.load().unwrap();
    assert_eq!(session.user.map(|u| u.name), Some("Ada".to_owned()));
    assert_eq!(session.token, Some(token));
}

#[tokio::test]
async fn restore_rejected_by_server_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "user not found"})))
        .mount(&server)
        .await;

    let (auth, store) = context(&server, Session::new(token_expiring_at(NOW + 600), stale_user()));
    assert_eq!(auth.restore(NOW).await.unwrap(), AuthStatus::Anonymous);
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn current_user_requires_live_session() {
    let store = Arc::new(MemorySessionStore::new(Session::new(token_expiring_at(NOW + 10), stale_user())));
    let auth = AuthContext::new(ApiClient::new("http://127.0.0.1:9", store).unwrap());
    assert!(auth.current_user(NOW).unwrap().is_some());
    assert!(auth.current_user(NOW + 11).unwrap().is_none());
}
