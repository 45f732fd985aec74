//! Session tokens and the access guard.
//!
//! Tokens are HS256 JWTs carried in an `HttpOnly` cookie. Gated routes run
//! behind [`require_auth`], which verifies the cookie and exposes the caller
//! to handlers through the [`AuthUser`] extractor.

use std::time::Duration;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Signing secret used outside production when `JWT_SECRET` is unset.
const DEV_SECRET: &str = "jobboard-dev-secret";

/// Claims reserved for the token itself.
const RESERVED_CLAIMS: [&str; 2] = ["iat", "exp"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Unauthorized: missing session token")]
    Missing,

    #[error("Unauthorized: invalid or expired session token")]
    Invalid,

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl AuthError {
    fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Invalid => "invalid",
            AuthError::Forbidden(_) => "forbidden",
        }
    }
}

/// Identity carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: String,

    /// Any other claims the caller supplied.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdentityClaims {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    #[serde(flatten)]
    identity: IdentityClaims,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Callers may put arbitrary claims in their identity, `aud` included.
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Build from configuration. Production requires `JWT_SECRET`.
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        let secret = match &config.jwt_secret {
            Some(secret) => secret.clone(),
            None if config.is_production() => {
                return Err(ApiError::internal("JWT_SECRET must be set in production"));
            }
            None => {
                warn!("JWT_SECRET not set, using the development signing secret");
                DEV_SECRET.to_string()
            }
        };
        Ok(Self::new(&secret, config.token_ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token valid for the configured lifetime from now.
    pub fn issue(&self, claims: &IdentityClaims) -> ApiResult<String> {
        self.issue_at(claims, Utc::now())
    }

    /// Issue a token as if it had been issued at `issued_at`.
    pub fn issue_at(&self, claims: &IdentityClaims, issued_at: DateTime<Utc>) -> ApiResult<String> {
        let mut identity = claims.clone();
        for key in RESERVED_CLAIMS {
            identity.extra.remove(key);
        }

        let iat = issued_at.timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))
            .ok_or_else(|| ApiError::internal("Token lifetime out of range"))?;
        let token_claims = TokenClaims { identity, iat, exp };

        let token = encode(&Header::new(Algorithm::HS256), &token_claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))?;
        metrics::record_token_issued();
        Ok(token)
    }

    /// Verify a token and return the identity it carries.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.identity)
            .map_err(|e| {
                debug!("Token verification failed: {}", e);
                AuthError::Invalid
            })
    }

    /// Cookie carrying a freshly issued token.
    pub fn cookie(&self, token: String, secure: bool) -> Cookie<'static> {
        Cookie::build((TOKEN_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(time::Duration::seconds(
                i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX),
            ))
            .secure(secure)
            .build()
    }
}

/// Cookie that clears the session token on the client.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE).path("/").build()
}

/// Authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub email: String,
    pub claims: IdentityClaims,
}

impl From<IdentityClaims> for AuthUser {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            email: claims.email.clone(),
            claims,
        }
    }
}

impl AuthUser {
    /// Ownership check: the identity a request is scoped to must be the caller's.
    pub fn ensure_is(&self, requested: Option<&str>) -> Result<(), AuthError> {
        match requested {
            Some(email) if email == self.email => Ok(()),
            _ => Err(AuthError::Forbidden(
                "requested identity does not match the session".to_string(),
            )),
        }
    }
}

/// Access guard for gated routes.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(request.headers());
    let verified = jar
        .get(TOKEN_COOKIE)
        .map(|c| c.value())
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Missing)
        .and_then(|token| state.tokens.verify(token));

    let claims = match verified {
        Ok(claims) => claims,
        Err(e) => {
            metrics::record_auth_failure(e.reason());
            return Err(e.into());
        }
    };

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Auth(AuthError::Missing))
    }
}
