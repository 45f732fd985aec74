//! Axum HTTP API server.
//!
//! This crate provides:
//! - Cookie-carried session tokens and the access guard
//! - Ownership-checked job and application queries
//! - Security headers, CORS and request logging
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{AuthError, AuthUser, IdentityClaims, TokenService};
pub use config::{ApiConfig, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use routes::create_router;
pub use services::{ApplicationService, JobService};
pub use state::AppState;
