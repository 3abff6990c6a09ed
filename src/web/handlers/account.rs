//! Account handlers and shared application state.

use axum::{extract::State, http::StatusCode, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::account::{AccountService, AddressAllocator};
use crate::attachment::AttachmentLimits;
use crate::blob::BlobStore;
use crate::mail::MailService;
use crate::web::dto::{
    AccountResponse, ApiResponse, ChangeAddressRequest, ProvisionResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims};
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Arc<Database>,
    /// Attachment bundle storage.
    pub blobs: Arc<dyn BlobStore>,
    /// Address allocator for new accounts.
    pub allocator: AddressAllocator,
    /// Attachment limits applied on send.
    pub limits: AttachmentLimits,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
}

impl AppState {
    /// Create a new application state with default limits and allocator.
    pub fn new(
        db: Arc<Database>,
        blobs: Arc<dyn BlobStore>,
        jwt_secret: &str,
        access_expiry: u64,
    ) -> Self {
        Self {
            db,
            blobs,
            allocator: AddressAllocator::new(
                crate::mail::DEFAULT_DOMAIN,
                crate::account::DEFAULT_MAX_ATTEMPTS,
            ),
            limits: AttachmentLimits::default(),
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
        }
    }

    /// Set the address allocator (and with it the mail domain).
    pub fn with_allocator(mut self, allocator: AddressAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Set the attachment limits.
    pub fn with_limits(mut self, limits: AttachmentLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Account service bound to this state.
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(&self.db, &self.allocator)
    }

    /// Mail service bound to this state.
    pub fn mail(&self) -> MailService<'_> {
        MailService::new(&self.db, self.blobs.as_ref())
            .with_limits(self.limits)
            .with_domain(self.allocator.domain())
    }

    /// Generate an access token for an account.
    pub fn generate_access_token(&self, account_id: i64) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: account_id,
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }
}

/// POST /api/accounts - Provision a new account.
pub async fn provision(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<ApiResponse<ProvisionResponse>>), ApiError> {
    let account = state.accounts().provision().await?;
    let access_token = state.generate_access_token(account.id)?;

    let response = ProvisionResponse {
        account: account.into(),
        access_token,
        token_type: "Bearer",
        expires_in: state.access_token_expiry,
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// GET /api/accounts/me - Get the current account.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = state.accounts().get(auth.account_id()).await?;
    Ok(Json(ApiResponse::new(account.into())))
}

/// PUT /api/accounts/me/address - Change the current account's address.
pub async fn change_address(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<ChangeAddressRequest>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = state
        .accounts()
        .change_address(auth.account_id(), req.address.trim())
        .await?;
    Ok(Json(ApiResponse::new(account.into())))
}
