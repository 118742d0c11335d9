//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use familygraph::{CurrentRequest, DomainMap, GraphClient, GraphConfig, InMemorySessionStore};
use wiremock::MockServer;

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const APP_HOST: &str = "app.test";

/// Route test logs through the test writer (`RUST_LOG=familygraph=debug`).
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn config(server: &MockServer) -> GraphConfig {
    GraphConfig::new(CLIENT_ID, CLIENT_SECRET).with_domains(DomainMap::uniform(server.uri()))
}

pub fn store() -> InMemorySessionStore {
    InMemorySessionStore::new(CLIENT_ID)
}

/// A plain page load with no callback parameters.
pub fn page(uri: &str) -> CurrentRequest {
    CurrentRequest::new(false, APP_HOST, uri)
}

/// The provider redirecting back with `code` and `state`.
pub fn callback(code: &str, state: &str) -> CurrentRequest {
    page(&format!("/family?code={code}&state={state}"))
}

pub async fn client(
    server: &MockServer,
    store: &InMemorySessionStore,
    request: CurrentRequest,
) -> GraphClient {
    init_tracing();
    GraphClient::builder(config(server))
        .store(Arc::new(store.clone()))
        .request(request)
        .build()
        .await
        .expect("client")
}
