//! Integration tests for the authorization-code flow
//!
//! Drives login URL generation, the CSRF-checked callback and the code for
//! token exchange against a mock accounts server.

mod support;

use familygraph::{ApiParams, SessionKey, SessionStore};
use serde_json::json;
use support::{callback, client, page, store, CLIENT_ID, CLIENT_SECRET};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_token_endpoint(server: &MockServer, code: &str, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Validates the full login round trip.
///
/// # Test Steps
/// 1. Build a login URL on a plain page load; the state is persisted
/// 2. Serve the callback carrying that state and a fresh code
/// 3. Verify the code is exchanged once with the client credentials and the
///    callback-free current URL as `redirect_uri`
/// 4. Verify the token and code are persisted and the state is consumed
/// 5. Verify a second lookup is served from memory
#[tokio::test(flavor = "multi_thread")]
async fn test_login_then_callback_exchanges_code_for_token() {
    let server = MockServer::start().await;
    let store = store();

    let mut first = client(&server, &store, page("/family")).await;
    let login_url = first.login_url(ApiParams::new()).await.expect("login url");
    let state = store.peek(SessionKey::State).expect("state persisted");
    assert!(login_url.contains(&format!("state={state}")));

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("client_id={CLIENT_ID}")))
        .and(body_string_contains(format!("client_secret={CLIENT_SECRET}")))
        .and(body_string_contains("redirect_uri=http%3A%2F%2Fapp.test%2Ffamily"))
        .and(body_string_contains("code=code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut second = client(&server, &store, callback("code-1", &state)).await;
    assert_eq!(second.access_token().await.unwrap().as_deref(), Some("tok-1"));
    assert_eq!(second.access_token().await.unwrap().as_deref(), Some("tok-1"));

    assert_eq!(store.peek(SessionKey::AccessToken).as_deref(), Some("tok-1"));
    assert_eq!(store.peek(SessionKey::Code).as_deref(), Some("code-1"));
    assert!(store.peek(SessionKey::State).is_none());
}

/// Validates that a callback state cannot be replayed.
///
/// # Test Steps
/// 1. Complete one callback with state `s-1`
/// 2. Replay `s-1` with a different code on a new page load
/// 3. Verify the second code is never exchanged and the persisted token stays
#[tokio::test(flavor = "multi_thread")]
async fn test_state_is_single_use() {
    let server = MockServer::start().await;
    let store = store();
    store.set(SessionKey::State, "s-1").await.unwrap();

    mount_token_endpoint(&server, "code-1", "tok-1", 1).await;
    mount_token_endpoint(&server, "code-2", "tok-2", 0).await;

    let mut first = client(&server, &store, callback("code-1", "s-1")).await;
    assert_eq!(first.access_token().await.unwrap().as_deref(), Some("tok-1"));

    let mut replay = client(&server, &store, callback("code-2", "s-1")).await;
    assert_eq!(replay.access_token().await.unwrap().as_deref(), Some("tok-1"));
    assert_eq!(store.peek(SessionKey::Code).as_deref(), Some("code-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mismatched_state_ignores_code() {
    let server = MockServer::start().await;
    let store = store();
    store.set(SessionKey::State, "expected").await.unwrap();

    mount_token_endpoint(&server, "code-1", "tok-1", 0).await;

    let mut client = client(&server, &store, callback("code-1", "forged")).await;
    assert_eq!(client.access_token().await.unwrap(), None);

    // the pending state survives a forged callback
    assert_eq!(store.peek(SessionKey::State).as_deref(), Some("expected"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_callback_without_pending_state_ignores_code() {
    let server = MockServer::start().await;
    let store = store();
    store.set(SessionKey::AccessToken, "tok-persisted").await.unwrap();

    mount_token_endpoint(&server, "code-1", "tok-1", 0).await;

    let mut client = client(&server, &store, callback("code-1", "anything")).await;
    assert_eq!(client.access_token().await.unwrap().as_deref(), Some("tok-persisted"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_already_exchanged_code_uses_persisted_token() {
    let server = MockServer::start().await;
    let store = store();
    store.set(SessionKey::State, "s-1").await.unwrap();
    store.set(SessionKey::Code, "code-1").await.unwrap();
    store.set(SessionKey::AccessToken, "tok-old").await.unwrap();

    mount_token_endpoint(&server, "code-1", "tok-new", 0).await;

    let mut client = client(&server, &store, callback("code-1", "s-1")).await;
    assert_eq!(client.access_token().await.unwrap().as_deref(), Some("tok-old"));
    assert!(store.peek(SessionKey::State).is_none());
}

/// Validates that a code the provider refuses invalidates the session.
///
/// # Test Steps
/// 1. Persist a stale token and user id plus a pending state
/// 2. Serve a callback whose code the token endpoint rejects
/// 3. Verify no token resolves and every persisted key is cleared
#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_code_clears_session() {
    let server = MockServer::start().await;
    let store = store();
    store.set(SessionKey::State, "s-1").await.unwrap();
    store.set(SessionKey::AccessToken, "tok-old").await.unwrap();
    store.set(SessionKey::UserId, "user-old").await.unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Code expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server, &store, callback("bogus", "s-1")).await;
    assert_eq!(client.access_token().await.unwrap(), None);
    assert!(store.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_token_response_without_access_token_resolves_to_none() {
    let server = MockServer::start().await;
    let store = store();
    store.set(SessionKey::State, "s-1").await.unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})))
        .mount(&server)
        .await;

    let mut client = client(&server, &store, callback("code-1", "s-1")).await;
    assert_eq!(client.access_token().await.unwrap(), None);
    assert!(store.peek(SessionKey::Code).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_explicit_token_skips_resolution() {
    let server = MockServer::start().await;
    let store = store();
    store.set(SessionKey::State, "s-1").await.unwrap();

    mount_token_endpoint(&server, "code-1", "tok-1", 0).await;

    let mut client = client(&server, &store, callback("code-1", "s-1")).await;
    client.set_access_token("tok-explicit");
    assert_eq!(client.access_token().await.unwrap().as_deref(), Some("tok-explicit"));

    // the callback was never consulted, so its state is still pending
    assert_eq!(store.peek(SessionKey::State).as_deref(), Some("s-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_url_reuses_pending_state_across_page_loads() {
    let server = MockServer::start().await;
    let store = store();

    let mut first = client(&server, &store, page("/")).await;
    first.login_url(ApiParams::new()).await.unwrap();
    let state = store.peek(SessionKey::State).unwrap();

    let mut second = client(&server, &store, page("/other")).await;
    let url = second.login_url(ApiParams::new().with("scope", "basic")).await.unwrap();

    assert!(url.contains(&format!("state={state}")));
    assert!(url.contains("scope=basic"));
    assert!(url.contains("redirect_uri=http%3A%2F%2Fapp.test%2Fother"));
}

struct UnavailableStore;

#[async_trait::async_trait]
impl SessionStore for UnavailableStore {
    async fn set(&self, _key: SessionKey, _value: &str) -> familygraph::Result<()> {
        Err(familygraph::GraphError::Store("backend offline".to_string()))
    }

    async fn get(&self, _key: SessionKey) -> familygraph::Result<Option<String>> {
        Err(familygraph::GraphError::Store("backend offline".to_string()))
    }

    async fn clear(&self, _key: SessionKey) -> familygraph::Result<()> {
        Err(familygraph::GraphError::Store("backend offline".to_string()))
    }

    async fn clear_all(&self) -> familygraph::Result<()> {
        Err(familygraph::GraphError::Store("backend offline".to_string()))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_store_failures_surface_as_store_errors() {
    let server = MockServer::start().await;

    let result = familygraph::GraphClient::builder(support::config(&server))
        .store(std::sync::Arc::new(UnavailableStore))
        .request(page("/"))
        .build()
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), familygraph::ErrorKind::Store);
    assert!(err.to_string().contains("backend offline"));
}
