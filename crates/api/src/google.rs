//! Google sign-in using the OAuth 2.0 authorization-code flow.

use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use pitsa_shared::config::GoogleConfig;

/// Errors talking to Google.
#[derive(Debug, Error)]
pub enum GoogleAuthError {
    /// A configured endpoint is not a valid URL.
    #[error("invalid Google endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP request failed or returned an unreadable body.
    #[error("request to Google failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Google answered with a non-success status.
    #[error("Google rejected the request ({status}): {body}")]
    Rejected {
        /// HTTP status returned by Google.
        status: u16,
        /// Response body.
        body: String,
    },
}

/// Profile returned by the user info endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account identifier.
    pub sub: String,
    /// Primary email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether Google verified the email address.
    #[serde(default)]
    pub email_verified: Option<bool>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the Google authorization, token and user info endpoints.
#[derive(Debug, Clone)]
pub struct GoogleAuthClient {
    config: GoogleConfig,
    redirect_uri: String,
    http: Client,
}

impl GoogleAuthClient {
    /// Creates a client for the configured OAuth application.
    #[must_use]
    pub fn new(config: GoogleConfig) -> Self {
        let redirect_uri = config.redirect_uri();
        Self {
            config,
            redirect_uri,
            http: Client::new(),
        }
    }

    /// Path Google redirects back to after consent.
    #[must_use]
    pub fn callback_path(&self) -> &str {
        &self.config.callback_path
    }

    /// Default destination after a successful sign-in.
    #[must_use]
    pub fn post_login_redirect(&self) -> &str {
        &self.config.post_login_redirect
    }

    /// URL of the Google consent screen for the given anti-forgery state.
    pub fn authorization_url(&self, state: &str) -> Result<Url, GoogleAuthError> {
        let scope = self.config.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )?;
        Ok(url)
    }

    /// Exchanges an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, GoogleAuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let token: TokenResponse = ensure_success(response).await?.json().await?;
        Ok(token.access_token)
    }

    /// Fetches the profile of the account behind an access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, GoogleAuthError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// Completes sign-in for an authorization code.
    pub async fn sign_in(&self, code: &str) -> Result<GoogleProfile, GoogleAuthError> {
        let access_token = self.exchange_code(code).await?;
        self.fetch_profile(&access_token).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, GoogleAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GoogleAuthError::Rejected {
        status: status.as_u16(),
        body,
    })
}
