//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Cookie session configuration.
    pub auth: AuthConfig,
    /// Google sign-in configuration. Sign-in is disabled when the section is
    /// absent; a section without both client credentials fails to load.
    #[serde(default)]
    pub google: Option<GoogleConfig>,
    /// Upload storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: API docs are served.
    #[default]
    Development,
    /// Production: HSTS is sent, API docs are hidden.
    Production,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Runtime environment.
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5233
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations on start-up.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API with credentials.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:4200".to_string()]
}

/// Cookie session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret key for signing session tokens.
    pub secret: String,
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Path attribute of the session cookie.
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
    /// Session lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Re-issue the cookie once half of its lifetime has passed.
    #[serde(default = "default_true")]
    pub sliding_expiration: bool,
    /// Only send the cookie over HTTPS.
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_cookie_name() -> String {
    "PitsaUzAuthCookie".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_session_ttl() -> u64 {
    86400 // 1 day
}

/// Google OAuth configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Path Google redirects back to.
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    /// Externally visible base URL of this server, used for the redirect URI.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Requested scopes.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Where to send the browser after sign-in when no return URL was given.
    #[serde(default = "default_post_login_redirect")]
    pub post_login_redirect: String,
    /// Authorization endpoint.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// User info endpoint.
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
}

impl GoogleConfig {
    /// The absolute redirect URI registered with Google.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!(
            "{}{}",
            self.public_base_url.trim_end_matches('/'),
            self.callback_path
        )
    }
}

fn default_callback_path() -> String {
    "/signin-google".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:5233".to_string()
}

fn default_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "profile".to_string(),
        "email".to_string(),
    ]
}

fn default_post_login_redirect() -> String {
    "/".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

/// Upload storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Public web root. Falls back to `content_root` when unset.
    #[serde(default)]
    pub web_root: Option<PathBuf>,
    /// Application content root.
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            web_root: None,
            content_root: default_content_root(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_content_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("PITSA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("google.scopes")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
