//! Web API Account Tests
//!
//! Integration tests for account provisioning and address changes.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{create_test_app, error_message, get_data, provision, send_mail};

#[tokio::test]
async fn test_health() {
    let app = create_test_app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_provision_account() {
    let app = create_test_app().await;

    let response = app.server.post("/api/accounts").await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    let data = &body["data"];
    assert!(data["accessToken"].as_str().is_some());
    assert_eq!(data["tokenType"], "Bearer");
    assert_eq!(data["expiresIn"], 900);

    let address = data["account"]["address"].as_str().unwrap();
    let (username, domain) = address.split_once('@').unwrap();
    assert_eq!(domain, "suimail");
    assert_eq!(username.len(), 8);
    assert!(username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn test_provisioned_addresses_are_unique() {
    let app = create_test_app().await;

    let mut addresses = std::collections::HashSet::new();
    for _ in 0..20 {
        let account = provision(&app.server).await;
        assert!(addresses.insert(account.address));
    }
}

#[tokio::test]
async fn test_me() {
    let app = create_test_app().await;
    let account = provision(&app.server).await;

    let data = get_data(&app.server, &account, "/api/accounts/me").await;
    assert_eq!(data["id"], account.id);
    assert_eq!(data["address"], account.address.as_str());
    assert!(data["createdAt"].as_str().is_some());
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = create_test_app().await;

    let response = app.server.get("/api/accounts/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/accounts/me")
        .add_header(AUTHORIZATION, "Bearer not-a-token".to_string())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "UNAUTHORIZED"
    );
}

#[tokio::test]
async fn test_change_address() {
    let app = create_test_app().await;
    let account = provision(&app.server).await;

    let response = app
        .server
        .put("/api/accounts/me/address")
        .add_header(AUTHORIZATION, account.bearer())
        .json(&json!({ "address": "Alice" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["address"], "alice@suimail");

    let data = get_data(&app.server, &account, "/api/accounts/me").await;
    assert_eq!(data["address"], "alice@suimail");

    // Setting the current address again is a no-op
    let response = app
        .server
        .put("/api/accounts/me/address")
        .add_header(AUTHORIZATION, account.bearer())
        .json(&json!({ "address": "alice@suimail" }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_change_address_rejects_taken_address() {
    let app = create_test_app().await;
    let alice = provision(&app.server).await;
    let bob = provision(&app.server).await;

    let response = app
        .server
        .put("/api/accounts/me/address")
        .add_header(AUTHORIZATION, alice.bearer())
        .json(&json!({ "address": "alice" }))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .put("/api/accounts/me/address")
        .add_header(AUTHORIZATION, bob.bearer())
        .json(&json!({ "address": "ALICE@suimail" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "address is already taken");
}

#[tokio::test]
async fn test_change_address_rejects_invalid_input() {
    let app = create_test_app().await;
    let account = provision(&app.server).await;

    for address in ["ab", "bad name", "alice@other", "a".repeat(21).as_str()] {
        let response = app
            .server
            .put("/api/accounts/me/address")
            .add_header(AUTHORIZATION, account.bearer())
            .json(&json!({ "address": address }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    let response = app
        .server
        .put("/api/accounts/me/address")
        .add_header(AUTHORIZATION, account.bearer())
        .json(&json!({ "address": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "VALIDATION_ERROR"
    );
}

#[tokio::test]
async fn test_mail_follows_changed_address() {
    let app = create_test_app().await;
    let alice = provision(&app.server).await;
    let mut bob = provision(&app.server).await;

    let response = app
        .server
        .put("/api/accounts/me/address")
        .add_header(AUTHORIZATION, bob.bearer())
        .json(&json!({ "address": "bob" }))
        .await;
    response.assert_status_ok();
    bob.address = "bob@suimail".to_string();

    let mail = send_mail(&app.server, &alice, &bob, "Hi Bob", "New address works").await;
    assert_eq!(mail["recipient"]["id"], bob.id);
    assert_eq!(mail["recipient"]["address"], "bob@suimail");
}
