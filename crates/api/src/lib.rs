//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Upload routes backed by local file storage
//! - Google sign-in and cookie sessions
//! - Static serving of uploaded files
//! - OpenAPI docs in development

pub mod error;
pub mod google;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod session;


use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, header::STRICT_TRANSPORT_SECURITY},
    routing::get,
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use google::GoogleAuthClient;
use openapi::ApiDoc;
use pitsa_core::storage::{StorageService, UPLOADS_DIR};
use pitsa_shared::{JwtService, config::Environment};
use session::SessionCookies;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for session tokens.
    pub jwt_service: Arc<JwtService>,
    /// Session cookie settings.
    pub sessions: Arc<SessionCookies>,
    /// Storage service for uploaded files.
    pub storage: Arc<StorageService>,
    /// Google sign-in client, when configured.
    pub google: Option<Arc<GoogleAuthClient>>,
}

/// HTTP pipeline settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Origins allowed to call the API with credentials.
    pub allowed_origins: Vec<String>,
    /// Hosting environment.
    pub environment: Environment,
    /// Largest accepted upload request body.
    pub max_upload_bytes: usize,
}

/// HSTS value sent in production (30 days).
const HSTS_VALUE: &str = "max-age=2592000";

const DEFAULT_CALLBACK_PATH: &str = "/signin-google";

/// Creates the main application router.
pub fn create_router(state: AppState, http: &HttpConfig) -> Router {
    let callback_path = state
        .google
        .as_ref()
        .map_or(DEFAULT_CALLBACK_PATH, |g| g.callback_path())
        .to_owned();
    let uploads = ServeDir::new(state.storage.uploads_dir());

    let mut router = Router::new()
        .nest(
            "/api/v1",
            routes::api_routes_with_state(state.clone(), http.max_upload_bytes),
        )
        .merge(routes::auth::callback_routes(&callback_path))
        .nest_service(&format!("/{UPLOADS_DIR}"), uploads);

    if http.environment == Environment::Development {
        router = router
            .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
            .merge(Scalar::with_url("/", ApiDoc::openapi()));
    }

    let mut router = router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&http.allowed_origins));

    if http.environment == Environment::Production {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        ));
    }

    router.with_state(state)
}

/// CORS for the configured origins, with credentials.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
