//! Session cookie handlers.

use axum::extract::{Json, State};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::WithRejection;
use tracing::info;

use crate::auth::{removal_cookie, IdentityClaims};
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Issue a session token for the posted identity and set it as a cookie.
pub async fn issue_token(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(claims), _): WithRejection<Json<IdentityClaims>, ApiError>,
) -> ApiResult<(CookieJar, Json<ApiResponse<()>>)> {
    let token = state.tokens.issue(&claims)?;
    let cookie = state.tokens.cookie(token, state.config.is_production());
    info!(email = %claims.email, "Session token issued");

    Ok((
        jar.add(cookie),
        Json(ApiResponse::empty("Session token set")),
    ))
}

/// Clear the session cookie. Tokens already issued stay valid until they expire.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    (
        jar.remove(removal_cookie()),
        Json(ApiResponse::empty("Session token cleared")),
    )
}
