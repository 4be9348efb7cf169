//! Cookie authentication for protected routes.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, StatusCode, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::AppState;
use pitsa_shared::{Claims, JwtError};

fn unauthorized(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": error, "message": message })),
    )
        .into_response()
}

/// Authentication middleware that validates the session cookie.
///
/// Unauthenticated requests get a JSON 401, never a redirect. Valid claims
/// are stored in the request extensions. With sliding expiration on, a
/// session past half its lifetime is re-issued on the response.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let Some(token) = jar.get(state.sessions.name()).map(|c| c.value().to_owned()) else {
        return unauthorized("missing_session", "Sign in is required");
    };

    let claims = match state.jwt_service.validate_token(&token) {
        Ok(claims) => claims,
        Err(JwtError::Expired) => return unauthorized("session_expired", "Session has expired"),
        Err(_) => return unauthorized("invalid_session", "Invalid session cookie"),
    };

    let renew = state.sessions.sliding_expiration()
        && claims.is_past_half_life(Utc::now().timestamp());
    let renewal = renew.then(|| claims.clone());

    request.extensions_mut().insert(claims);
    let mut response = next.run(request).await;

    if let Some(claims) = renewal {
        match state.jwt_service.renew(&claims) {
            Ok(token) => {
                let cookie = state.sessions.session_cookie(token).to_string();
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        debug!(user_id = %claims.sub, "Session renewed");
                        response.headers_mut().append(SET_COOKIE, value);
                    }
                    Err(e) => warn!(error = %e, "Renewed session cookie is not a valid header"),
                }
            }
            Err(e) => warn!(error = %e, "Failed to renew session"),
        }
    }

    response
}

/// Extractor for the signed-in user's claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> uuid::Uuid {
        self.0.user_id()
    }

    /// Returns the inner claims.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "unauthorized",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}
