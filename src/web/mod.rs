//! Web API for Suimail.
//!
//! JSON over HTTP under `/api`, authenticated with bearer access tokens
//! issued when an account is provisioned.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
