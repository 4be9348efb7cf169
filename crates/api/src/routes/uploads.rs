//! Image upload routes backed by local file storage.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
};
use pitsa_shared::AppError;

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Creates the upload routes, limiting request bodies to `max_upload_bytes`.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/uploads", post(upload_file).delete(delete_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Response for a stored upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Web-relative path of the stored file, e.g. `/uploads/<uuid>.png`.
    pub path: String,
}

/// Query for deleting an upload.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteUploadQuery {
    /// Path previously returned by the upload endpoint.
    pub path: Option<String>,
}

/// POST `/uploads` - store the `file` field of a multipart form.
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    tag = "uploads",
    request_body(
        content_type = "multipart/form-data",
        description = "Form with a single `file` field"
    ),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing or empty file", body = crate::error::ErrorBody),
        (status = 401, description = "Not signed in"),
        (status = 413, description = "File exceeds the upload limit", body = crate::error::ErrorBody)
    ),
    security(("cookie_auth" = []))
)]
pub async fn upload_file(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_owned();
        let Some(stored) = state.storage.store(field, &original_name).await? else {
            return Err(AppError::Validation("uploaded file is empty".to_string()).into());
        };

        info!(
            user_id = %auth.user_id(),
            path = %stored.logical_path,
            size = stored.size,
            "Upload stored"
        );
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                path: stored.logical_path,
            }),
        ));
    }

    Err(ApiError::from(AppError::Validation(format!(
        "multipart field `{FILE_FIELD}` is required"
    ))))
}

/// DELETE `/uploads?path=` - remove a stored file in the background.
///
/// Always answers 204; a missing or invalid path is only logged.
#[utoipa::path(
    delete,
    path = "/api/v1/uploads",
    tag = "uploads",
    params(DeleteUploadQuery),
    responses(
        (status = 204, description = "Deletion scheduled"),
        (status = 401, description = "Not signed in")
    ),
    security(("cookie_auth" = []))
)]
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DeleteUploadQuery>,
) -> StatusCode {
    let path = query.path.unwrap_or_default();
    debug!(user_id = %auth.user_id(), path = %path, "Upload deletion requested");

    state.storage.delete(&path).detach();
    StatusCode::NO_CONTENT
}
