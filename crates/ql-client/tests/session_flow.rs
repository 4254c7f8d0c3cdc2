use std::sync::Arc;

use ql_client::{
    AuthFlow, ClientConfig, ClientError, Endpoints, LauncherClient, ServerHealth, SessionManager,
};
use ql_store::{CoreSettings, DataStore, ExperimentalSettings, LauncherSettings};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn core() -> CoreSettings {
    CoreSettings {
        username: "player@example.com".to_string(),
        password: "hunter2".to_string(),
        file_path: "/games/qc/client/bin/pc/QuakeChampions.exe".into(),
        language: "en".to_string(),
        fingerprint: "fp".to_string(),
    }
}

async fn setup(server: &MockServer, token: Option<&str>) -> (LauncherClient, TempDir) {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(DataStore::in_dir(temp.path()));
    store
        .save_configuration(
            &core(),
            &ExperimentalSettings::default(),
            &LauncherSettings::default(),
        )
        .await
        .unwrap();
    if let Some(token) = token {
        store.update_auth_token(token).await.unwrap();
    }

    let config = ClientConfig::new(Endpoints::all_at(&server.uri()));
    let client = LauncherClient::new(config, store).unwrap();
    (client, temp)
}

fn auth_body(token: &str) -> serde_json::Value {
    json!({
        "token": token,
        "session_id": "srv-session",
        "entitlement_ids": [12, 48329]
    })
}

#[tokio::test]
async fn test_fresh_authentication_persists_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cdp-user/auth"))
        .and(header("x-cdp-app", "Bethesda Launcher"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("fresh-token")))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _temp) = setup(&server, None).await;
    let cfg = client.store().load_configuration().await.unwrap();

    let session = SessionManager::new(client.clone())
        .authenticate(&cfg)
        .await
        .unwrap();

    assert_eq!(session.flow, AuthFlow::Fresh);
    assert_eq!(client.store().auth_token().await.unwrap(), "fresh-token");
}

#[tokio::test]
async fn test_stored_token_is_verified_without_store_change() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cdp-user/verify/.json"))
        .and(header("authorization", "Token stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("stored-token")))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _temp) = setup(&server, Some("stored-token")).await;
    let cfg = client.store().load_configuration().await.unwrap();

    let session = SessionManager::new(client.clone())
        .authenticate(&cfg)
        .await
        .unwrap();

    assert_eq!(session.flow, AuthFlow::Verified);
    assert_eq!(client.store().auth_token().await.unwrap(), "stored-token");
}

#[tokio::test]
async fn test_rejected_token_is_cleared() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cdp-user/verify/.json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cdp-user/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("never")))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _temp) = setup(&server, Some("old-token")).await;
    let cfg = client.store().load_configuration().await.unwrap();

    let err = SessionManager::new(client.clone())
        .authenticate(&cfg)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::StaleToken));
    assert!(err.is_auth_failure());
    assert_eq!(client.store().auth_token().await.unwrap(), "");
}

#[tokio::test]
async fn test_verify_server_error_keeps_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cdp-user/verify/.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (client, _temp) = setup(&server, Some("old-token")).await;
    let cfg = client.store().load_configuration().await.unwrap();

    let err = SessionManager::new(client.clone())
        .authenticate(&cfg)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status, .. } if status.as_u16() == 503));
    assert_eq!(client.store().auth_token().await.unwrap(), "old-token");
}

#[tokio::test]
async fn test_pre_save_rejection_is_credential_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cdp-user/auth"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let store = Arc::new(DataStore::in_dir(temp.path()));
    let client = LauncherClient::new(
        ClientConfig::new(Endpoints::all_at(&server.uri())),
        store.clone(),
    )
    .unwrap();

    let err = SessionManager::new(client)
        .verify_credentials("player@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::CredentialMismatch));
    assert!(!store.has_pending_token());
}

#[tokio::test]
async fn test_pre_save_success_stages_token_before_first_save() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cdp-user/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("staged")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let store = Arc::new(DataStore::in_dir(temp.path()));
    let client = LauncherClient::new(
        ClientConfig::new(Endpoints::all_at(&server.uri())),
        store.clone(),
    )
    .unwrap();

    SessionManager::new(client)
        .verify_credentials("player@example.com", "hunter2")
        .await
        .unwrap();
    assert!(!store.exists().await);

    store
        .save_configuration(
            &core(),
            &ExperimentalSettings::default(),
            &LauncherSettings::default(),
        )
        .await
        .unwrap();
    assert_eq!(store.auth_token().await.unwrap(), "staged");
}

#[tokio::test]
async fn test_auth_without_entitlement_fails_validation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cdp-user/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "t",
            "entitlement_ids": [1]
        })))
        .mount(&server)
        .await;

    let (client, _temp) = setup(&server, None).await;
    let cfg = client.store().load_configuration().await.unwrap();

    let err = SessionManager::new(client.clone())
        .authenticate(&cfg)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation { .. }));
    assert!(err.is_request_failure());
    assert_eq!(client.store().auth_token().await.unwrap(), "");
}

#[tokio::test]
async fn test_server_status_is_best_effort() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/ext-server-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "platform": {"code": 200, "message": "success", "response": {"Quake": "DOWN"}}
        })))
        .mount(&server)
        .await;

    let (client, _temp) = setup(&server, None).await;
    assert_eq!(client.check_server_status().await, ServerHealth::Offline);

    let unreachable = LauncherClient::new(
        ClientConfig::new(Endpoints::all_at("http://127.0.0.1:9")),
        client.store().clone(),
    )
    .unwrap();
    assert!(matches!(
        unreachable.check_server_status().await,
        ServerHealth::Unknown(_)
    ));
}

#[tokio::test]
async fn test_update_requests_carry_launcher_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/update/launcher"))
        .and(header("lver", "v1.05"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latest": 1.10,
            "date": "2024-05-01T12:00:00Z",
            "url": "https://example.com/download"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _temp) = setup(&server, None).await;
    let info = client.launcher_update().await.unwrap();

    assert!(info.latest > 1.05);
    assert!(info.date.is_some());
}
