// mesa-client/tests/transport_auth.rs
// Token attachment, status mapping and the implicit logout, exercised
// against a real HTTP server

use mesa_client::cache::QueryStatus;
use mesa_client::client::MesaClient;
use mesa_client::config::ClientConfig;
use mesa_client::session::MemorySessionStorage;
use shared::ErrorKind;
use shared::models::TableAvailability;
use shared::request::SearchParams;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn login_body() -> serde_json::Value {
    serde_json::json!({
        "tokens": { "access_token": "tok-1", "refresh_token": "r" },
        "user": {
            "id": 1,
            "username": "alice",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "A",
            "role": "user"
        }
    })
}

/// All three services pointed at one mock server
async fn client_for(server: &MockServer) -> MesaClient {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let config = ClientConfig {
        users_api_url: server.uri(),
        reservations_api_url: server.uri(),
        search_api_url: server.uri(),
        request_timeout: Duration::from_secs(5),
        stale_time: Duration::from_secs(30),
        ..ClientConfig::default()
    };
    MesaClient::with_storage(config, Arc::new(MemorySessionStorage::default())).unwrap()
}

#[tokio::test]
async fn bearer_token_is_attached_after_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(&server)
        .await;
    // Only a request carrying the token from the login response matches.
    Mock::given(method("GET"))
        .and(path("/api/reservations"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.session().login("alice", "secret123").await.unwrap();

    let mut sub = client.subscribe_reservations();
    let snapshot = sub.settled().await;
    assert_eq!(snapshot.status, QueryStatus::Success);
}

#[tokio::test]
async fn denied_request_tears_the_session_down() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": "token expired"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.session().login("alice", "secret123").await.unwrap();
    assert!(client.session().is_authenticated());
    let auth = client.session().watch_authenticated();

    let err = client
        .search_api()
        .search(&SearchParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.detail(), "token expired");

    // The teardown already happened when the error surfaced.
    assert!(client.session().current_session().is_none());
    assert!(!*auth.borrow());
}

#[tokio::test]
async fn rejected_login_does_not_touch_an_existing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": "invalid_credentials"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.session().login("alice", "secret123").await.unwrap();

    // A failed re-login (wrong password) is an exempt-path denial: it
    // reports Authentication but must not clear the current session.
    let err = client
        .session()
        .login("alice", "wrong")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.detail(), "invalid_credentials");

    let session = client.session().current_session().unwrap();
    assert_eq!(session.token, "tok-1");
}

#[tokio::test]
async fn conflict_status_maps_with_the_service_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/search/reindex"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(serde_json::json!({"error": "reindex already running"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.session().login("alice", "secret123").await.unwrap();

    let err = client.mutations().reindex().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.detail(), "reindex already running");
    // Session survives a conflict.
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn search_decodes_the_exported_casing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("date", "2025-06-01"))
        .and(query_param("meal_type", "dinner"))
        .and(query_param("is_available", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Results": [{
                "id": "table-dinner-5-2025-06-01",
                "table_number": 5,
                "capacity": 4,
                "meal_type": "dinner",
                "date": "2025-06-01",
                "is_available": true
            }],
            "Total": 1,
            "Page": 1,
            "Size": 10,
            "Pages": 1
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let params = SearchParams::availability("2025-06-01".parse().unwrap(), shared::models::MealType::Dinner);
    let page = client.search_api().search(&params).await.unwrap();
    assert_eq!(page.total, 1);
    let table: &TableAvailability = &page.results[0];
    assert_eq!(table.table_number, 5);
    assert!(table.is_available);
}

#[tokio::test]
async fn unresolved_dependent_query_sends_nothing() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would 404 and the test would notice
    // below anyway.
    let client = client_for(&server).await;

    let mut sub = client.subscribe_user_reservations(None);
    let snapshot = sub.settled().await;
    assert_eq!(snapshot.status, QueryStatus::Idle);
    assert!(snapshot.data.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}
