//! OpenAPI document served in development.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::{error::ErrorBody, routes};

/// Security scheme for the session cookie.
struct CookieSecurityAddon;

impl Modify for CookieSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "cookie_auth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "PitsaUzAuthCookie",
                "Session cookie issued after Google sign-in",
            ))),
        );
    }
}

/// OpenAPI document for the PitsaUz API.
#[derive(OpenApi)]
#[openapi(
    info(title = "PitsaUz API", version = "v1"),
    paths(
        routes::health::health_check,
        routes::auth::google_login,
        routes::auth::google_callback,
        routes::auth::logout,
        routes::auth::me,
        routes::uploads::upload_file,
        routes::uploads::delete_file,
    ),
    components(schemas(
        ErrorBody,
        routes::health::HealthResponse,
        routes::auth::SessionUser,
        routes::uploads::UploadResponse,
    )),
    modifiers(&CookieSecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Google sign-in and cookie sessions"),
        (name = "uploads", description = "Image uploads served under /uploads"),
    )
)]
pub struct ApiDoc;
