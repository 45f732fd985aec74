//! API routes.

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::auth::require_auth;
use crate::handlers::{
    create_application, create_job, get_job, health, issue_token, list_applications_for_job,
    list_jobs, list_jobs_with_application_counts, list_my_applications, logout, ready, root,
    update_application_status,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let public_routes = Router::new()
        .route("/jwt", post(issue_token))
        .route("/logout", post(logout))
        .route("/jobs", get(list_jobs))
        .route("/job/:id", get(get_job))
        .route("/applications", post(create_application));

    // Every route below requires a valid session cookie
    let protected_routes = Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/applications", get(list_jobs_with_application_counts))
        .route("/applications", get(list_my_applications))
        .route("/applications/job/:id", get(list_applications_for_job))
        .route("/applications/:id", patch(update_application_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let health_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
