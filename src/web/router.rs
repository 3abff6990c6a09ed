//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    change_address, delete_for_recipient, delete_for_sender, delete_many_for_recipient,
    delete_many_for_sender, download_attachment, get_mail, inbox, mark_read_many, me, outbox,
    provision, replies, send_mail, unread_count, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Room left in a send request for text fields and multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    // Must stay above the attachment total limit
    let body_limit = usize::try_from(app_state.limits.max_total_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let account_routes = Router::new()
        .route("/", post(provision))
        .route("/me", get(me))
        .route("/me/address", put(change_address));

    let mail_routes = Router::new()
        .route(
            "/send",
            post(send_mail).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/inbox/me", get(inbox))
        .route("/outbox/me", get(outbox))
        .route("/unread-count", get(unread_count))
        .route("/read-many", post(mark_read_many))
        .route("/sender/delete-many", delete(delete_many_for_sender))
        .route("/recipient/delete-many", delete(delete_many_for_recipient))
        .route("/sender/delete/:id", delete(delete_for_sender))
        .route("/recipient/delete/:id", delete(delete_for_recipient))
        .route("/:id", get(get_mail))
        .route("/:id/replies", get(replies))
        .route("/:id/attachments/:position", get(download_attachment));

    let api_routes = Router::new()
        .nest("/accounts", account_routes)
        .nest("/mail", mail_routes);

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let response = create_health_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_success());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }
}
