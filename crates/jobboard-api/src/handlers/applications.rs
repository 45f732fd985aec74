//! Application handlers.

use axum::extract::{Json, Path, Query, State};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use jobboard_models::{Application, InsertResult, JobRef, NewApplication, UpdateResult};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::jobs::EmailQuery;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Body of a status update.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// The caller's applications, each with its job attached.
pub async fn list_my_applications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Application>>>> {
    let applications = state
        .applications
        .list_my_applications(query.email.as_deref(), &user)
        .await?;
    Ok(Json(ApiResponse::ok("Applications retrieved", applications)))
}

/// Applications submitted for one of the caller's jobs.
pub async fn list_applications_for_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<Application>>>> {
    let applications = state
        .applications
        .list_applications_for_job(&user, &JobRef::new(id))
        .await?;
    Ok(Json(ApiResponse::ok("Applications retrieved", applications)))
}

/// Submit an application.
pub async fn create_application(
    State(state): State<AppState>,
    WithRejection(Json(application), _): WithRejection<Json<NewApplication>, ApiError>,
) -> ApiResult<Json<ApiResponse<InsertResult>>> {
    let inserted = state.applications.create_application(application).await?;
    Ok(Json(ApiResponse::ok("Application submitted", inserted)))
}

/// Review an application.
pub async fn update_application_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    WithRejection(Json(update), _): WithRejection<Json<StatusUpdate>, ApiError>,
) -> ApiResult<Json<ApiResponse<UpdateResult>>> {
    let result = state
        .applications
        .update_application_status(&user, &id, &update.status)
        .await?;
    Ok(Json(ApiResponse::ok("Application status updated", result)))
}
