//! Authentication routes: Google sign-in, logout and the current session.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::form_urlencoded;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    google::GoogleAuthClient,
    middleware::AuthUser,
};
use pitsa_db::{GoogleUserInput, UserRepository};
use pitsa_shared::AppError;

/// Cookie correlating the Google redirect with the browser that started it.
pub const CORRELATION_COOKIE: &str = "PitsaUzOAuth";

const CORRELATION_TTL_SECS: i64 = 600;

/// Creates the public auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_login))
        .route("/auth/logout", post(logout))
}

/// Creates the auth routes that need a session.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

/// Creates the route Google redirects back to.
pub fn callback_routes(callback_path: &str) -> Router<AppState> {
    Router::new().route(callback_path, get(google_callback))
}

/// Query accepted when starting sign-in.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Relative path to return to after sign-in.
    pub return_url: Option<String>,
}

/// Query Google sends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code.
    pub code: Option<String>,
    /// Anti-forgery state echoed back by Google.
    pub state: Option<String>,
    /// Set when the user declined or Google failed.
    pub error: Option<String>,
}

/// The signed-in user.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    /// User ID.
    pub id: Uuid,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
}

fn google_client(state: &AppState) -> ApiResult<Arc<GoogleAuthClient>> {
    state.google.clone().ok_or_else(|| {
        ApiError(AppError::ServiceUnavailable(
            "Google sign-in is not configured".to_string(),
        ))
    })
}

/// Accepts only local paths so the callback cannot redirect off-site.
fn local_return_url(candidate: Option<&str>) -> Option<&str> {
    candidate.filter(|url| {
        url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
    })
}

fn encode_correlation(state: &str, return_url: Option<&str>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("state", state);
    if let Some(return_url) = return_url {
        serializer.append_pair("return_url", return_url);
    }
    serializer.finish()
}

fn decode_correlation(value: &str) -> (Option<String>, Option<String>) {
    let mut state = None;
    let mut return_url = None;
    for (key, value) in form_urlencoded::parse(value.as_bytes()) {
        match key.as_ref() {
            "state" => state = Some(value.into_owned()),
            "return_url" => return_url = Some(value.into_owned()),
            _ => {}
        }
    }
    (state, return_url)
}

fn correlation_cookie(value: String, path: String) -> Cookie<'static> {
    Cookie::build((CORRELATION_COOKIE, value))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(CORRELATION_TTL_SECS))
        .build()
}

/// GET `/auth/google` - redirect the browser to Google.
#[utoipa::path(
    get,
    path = "/api/v1/auth/google",
    tag = "auth",
    params(LoginQuery),
    responses(
        (status = 303, description = "Redirect to the Google consent screen"),
        (status = 503, description = "Google sign-in is not configured", body = crate::error::ErrorBody)
    )
)]
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> ApiResult<(CookieJar, Redirect)> {
    let google = google_client(&state)?;

    let csrf_state = Uuid::new_v4().simple().to_string();
    let url = google
        .authorization_url(&csrf_state)
        .map_err(|e| ApiError(AppError::Internal(e.to_string())))?;

    let value = encode_correlation(&csrf_state, local_return_url(query.return_url.as_deref()));
    let jar = jar.add(correlation_cookie(value, google.callback_path().to_owned()));

    Ok((jar, Redirect::to(url.as_str())))
}

/// GET callback - finish Google sign-in and issue the session cookie.
#[utoipa::path(
    get,
    path = "/signin-google",
    tag = "auth",
    responses(
        (status = 303, description = "Signed in, redirect to the application"),
        (status = 401, description = "Sign-in failed or was tampered with", body = crate::error::ErrorBody),
        (status = 403, description = "Google account has no verified email", body = crate::error::ErrorBody),
        (status = 502, description = "Google could not be reached", body = crate::error::ErrorBody)
    )
)]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<(CookieJar, Redirect)> {
    let google = google_client(&state)?;

    if let Some(error) = query.error {
        info!(error = %error, "Google sign-in was not completed");
        return Err(AppError::Unauthorized(format!("Google sign-in failed: {error}")).into());
    }

    let (expected_state, return_url) = jar
        .get(CORRELATION_COOKIE)
        .map(|c| decode_correlation(c.value()))
        .unwrap_or_default();
    let jar = jar.remove(Cookie::build(CORRELATION_COOKIE).path(google.callback_path().to_owned()));

    match (expected_state.as_deref(), query.state.as_deref()) {
        (Some(expected), Some(actual)) if expected == actual => {}
        _ => {
            warn!("Google callback state does not match");
            return Err(AppError::Unauthorized("sign-in state mismatch".to_string()).into());
        }
    }

    let code = query
        .code
        .ok_or_else(|| ApiError(AppError::Unauthorized("missing authorization code".to_string())))?;

    let profile = google
        .sign_in(&code)
        .await
        .map_err(|e| ApiError(AppError::ExternalService(e.to_string())))?;

    let email = match (profile.email, profile.email_verified) {
        (Some(email), Some(true)) => email,
        _ => {
            return Err(AppError::Forbidden(
                "Google account has no verified email".to_string(),
            )
            .into());
        }
    };

    let users = UserRepository::new((*state.db).clone());
    let user = users
        .upsert_google_user(GoogleUserInput {
            subject: profile.sub,
            email,
            full_name: profile.name,
            avatar_url: profile.picture,
        })
        .await?;

    let token =
        state
            .jwt_service
            .generate_session_token(user.id, &user.email, user.full_name.as_deref())?;
    let jar = jar.add(state.sessions.session_cookie(token));

    info!(user_id = %user.id, "User signed in with Google");

    let target = local_return_url(return_url.as_deref())
        .unwrap_or_else(|| google.post_login_redirect())
        .to_owned();
    Ok((jar, Redirect::to(&target)))
}

/// POST `/auth/logout` - clear the session cookie.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses((status = 204, description = "Session cookie cleared"))
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    (
        StatusCode::NO_CONTENT,
        jar.add(state.sessions.removal_cookie()),
    )
}

/// GET `/auth/me` - the user behind the session cookie.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = SessionUser),
        (status = 401, description = "Not signed in")
    ),
    security(("cookie_auth" = []))
)]
pub async fn me(auth: AuthUser) -> Json<SessionUser> {
    let claims = auth.claims();
    Json(SessionUser {
        id: claims.user_id(),
        email: claims.email.clone(),
        name: claims.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("/menu"), Some("/menu"))]
    #[case(Some("/orders?id=1"), Some("/orders?id=1"))]
    #[case(Some("//evil.example"), None)]
    #[case(Some("/\\evil.example"), None)]
    #[case(Some("https://evil.example"), None)]
    #[case(None, None)]
    fn test_local_return_url(#[case] input: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(local_return_url(input), expected);
    }

    #[test]
    fn test_correlation_roundtrip_with_special_characters() {
        let value = encode_correlation("abc", Some("/menu?size=large&x=1"));
        let (state, return_url) = decode_correlation(&value);

        assert_eq!(state.as_deref(), Some("abc"));
        assert_eq!(return_url.as_deref(), Some("/menu?size=large&x=1"));
    }

    #[test]
    fn test_correlation_without_return_url() {
        let (state, return_url) = decode_correlation(&encode_correlation("abc", None));

        assert_eq!(state.as_deref(), Some("abc"));
        assert_eq!(return_url, None);
    }
}
