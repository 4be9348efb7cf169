//! Session cookie construction.

use axum_extra::extract::cookie::{Cookie, SameSite};
use pitsa_shared::config::AuthConfig;

/// Builds the auth cookie that carries the session token.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    name: String,
    path: String,
    secure: bool,
    ttl_secs: i64,
    sliding_expiration: bool,
}

impl SessionCookies {
    /// Creates the cookie settings from the auth configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            path: config.cookie_path.clone(),
            secure: config.secure_cookie,
            ttl_secs: i64::try_from(config.session_ttl_secs).unwrap_or(i64::MAX),
            sliding_expiration: config.sliding_expiration,
        }
    }

    /// Cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether sessions are re-issued once past half their lifetime.
    #[must_use]
    pub const fn sliding_expiration(&self) -> bool {
        self.sliding_expiration
    }

    /// Cookie holding a freshly issued session token.
    #[must_use]
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token))
            .path(self.path.clone())
            .http_only(true)
            .same_site(SameSite::None)
            .secure(self.secure)
            .max_age(time::Duration::seconds(self.ttl_secs))
            .build()
    }

    /// Cookie that clears the session in the browser.
    #[must_use]
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.name.clone(), ""))
            .path(self.path.clone())
            .http_only(true)
            .same_site(SameSite::None)
            .secure(self.secure)
            .build();
        cookie.make_removal();
        cookie
    }
}
