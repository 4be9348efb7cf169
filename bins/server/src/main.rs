//! PitsaUz API Server
//!
//! Main entry point for the PitsaUz backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pitsa_api::{
    AppState, HttpConfig, create_router, google::GoogleAuthClient, session::SessionCookies,
};
use pitsa_core::storage::{StorageConfig, StorageService};
use pitsa_db::{connect, migrate};
use pitsa_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitsa=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    info!(environment = ?config.server.environment, "Configuration loaded");

    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    if config.database.run_migrations {
        migrate(&db).await.context("failed to run migrations")?;
        info!("Database migrations applied");
    }

    let mut storage_config = StorageConfig::new(&config.storage.content_root);
    if let Some(web_root) = &config.storage.web_root {
        storage_config = storage_config.with_web_root(web_root);
    }
    let storage = StorageService::init(&storage_config)
        .await
        .context("failed to prepare upload storage")?;

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.auth.secret.clone(),
        session_ttl_secs: i64::try_from(config.auth.session_ttl_secs).unwrap_or(i64::MAX),
    });

    let google = match config.google.clone() {
        Some(google) => {
            info!(callback = %google.callback_path, "Google sign-in enabled");
            Some(Arc::new(GoogleAuthClient::new(google)))
        }
        None => {
            warn!("Google sign-in is not configured");
            None
        }
    };

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        sessions: Arc::new(SessionCookies::from_config(&config.auth)),
        storage: Arc::new(storage),
        google,
    };

    let http = HttpConfig {
        allowed_origins: config.cors.allowed_origins.clone(),
        environment: config.server.environment,
        max_upload_bytes: config.storage.max_upload_bytes,
    };
    let app = create_router(state, &http);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
