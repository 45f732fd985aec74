//! Job handlers.

use axum::extract::{Json, Path, Query, State};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{Map, Value};

use jobboard_models::{InsertResult, Job};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// `?email=` filter shared by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

/// List jobs, optionally only those of one poster.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Job>>>> {
    let jobs = state.jobs.list_jobs(query.email.as_deref()).await?;
    Ok(Json(ApiResponse::ok("Jobs retrieved", jobs)))
}

/// Get a single job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Job>>> {
    let job = state.jobs.get_job(&id).await?;
    Ok(Json(ApiResponse::ok("Job retrieved", job)))
}

/// The caller's jobs with their application counts.
pub async fn list_jobs_with_application_counts(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Job>>>> {
    user.ensure_is(query.email.as_deref())?;
    let jobs = state
        .jobs
        .list_jobs_with_application_counts(&user.email)
        .await?;
    Ok(Json(ApiResponse::ok("Posted jobs retrieved", jobs)))
}

/// Post a job.
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(payload), _): WithRejection<Json<Map<String, Value>>, ApiError>,
) -> ApiResult<Json<ApiResponse<InsertResult>>> {
    let inserted = state.jobs.create_job(&user, payload).await?;
    Ok(Json(ApiResponse::ok("Job posted", inserted)))
}
