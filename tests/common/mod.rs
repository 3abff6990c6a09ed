//! Shared helpers for Web API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::Value;

use suimail::attachment::AttachmentLimits;
use suimail::blob::{BlobStore, MemoryBlobStore};
use suimail::web::handlers::AppState;
use suimail::web::middleware::JwtState;
use suimail::web::router::{create_health_router, create_router};
use suimail::Database;

/// JWT secret used by every test server.
pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// A test server with handles to its storage.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub blobs: Arc<MemoryBlobStore>,
}

/// A provisioned account and its access token.
pub struct TestAccount {
    pub id: i64,
    pub address: String,
    pub token: String,
}

impl TestAccount {
    /// Value for the Authorization header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Create a test server with an in-memory database and blob store.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_limits(AttachmentLimits::default()).await
}

/// Create a test server with custom attachment limits.
pub async fn create_test_app_with_limits(limits: AttachmentLimits) -> TestApp {
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    let blobs = Arc::new(MemoryBlobStore::new());
    let store: Arc<dyn BlobStore> = blobs.clone();

    let app_state = Arc::new(AppState::new(db.clone(), store, JWT_SECRET, 900).with_limits(limits));
    let jwt_state = Arc::new(JwtState::new(JWT_SECRET));

    let router = create_router(app_state, jwt_state, &[]).merge(create_health_router());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp { server, db, blobs }
}

/// Provision a new account.
pub async fn provision(server: &TestServer) -> TestAccount {
    let response = server.post("/api/accounts").await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    TestAccount {
        id: body["data"]["account"]["id"].as_i64().unwrap(),
        address: body["data"]["account"]["address"]
            .as_str()
            .unwrap()
            .to_string(),
        token: body["data"]["accessToken"].as_str().unwrap().to_string(),
    }
}

/// Multipart form with the required send fields.
pub fn mail_form(recipient: &str, subject: &str, body: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("recipient", recipient.to_string())
        .add_text("subject", subject.to_string())
        .add_text("body", body.to_string())
}

/// File part for the `attachments` field.
pub fn file_part(filename: &str, mime_type: &str, data: Vec<u8>) -> Part {
    Part::bytes(data)
        .file_name(filename.to_string())
        .mime_type(mime_type.to_string())
}

/// Post a send form as the given account.
pub async fn post_mail(server: &TestServer, from: &TestAccount, form: MultipartForm) -> TestResponse {
    server
        .post("/api/mail/send")
        .add_header(AUTHORIZATION, from.bearer())
        .multipart(form)
        .await
}

/// Send a plain mail and return the created mail's JSON.
pub async fn send_mail(
    server: &TestServer,
    from: &TestAccount,
    to: &TestAccount,
    subject: &str,
    body: &str,
) -> Value {
    let response = post_mail(server, from, mail_form(&to.address, subject, body)).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

/// GET a JSON endpoint as the given account and return its `data`.
pub async fn get_data(server: &TestServer, account: &TestAccount, path: &str) -> Value {
    let response = server
        .get(path)
        .add_header(AUTHORIZATION, account.bearer())
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"].clone()
}

/// Error message from an error response.
pub fn error_message(response: &TestResponse) -> String {
    response.json::<Value>()["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
