//! Ephemeral image upload and retrieval.
//!
//! The widget uploads a screenshot or picture as a data URL, gets back a
//! retrieval URL, and references that URL from an image part of its next
//! chat message.  Images expire after the configured TTL.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use nerd_core::store::decode_payload;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::routes::parse_json_body;
use crate::schemas::ErrorResponse;
use crate::schemas::images::{UploadImageRequest, UploadImageResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(upload_image, get_image),
    components(schemas(UploadImageRequest, UploadImageResponse, ErrorResponse))
)]
pub struct ImagesApi;

/// Register image routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/upload-image", post(upload_image))
        .route("/api/images/{id}", get(get_image))
}

/// Store an image for one hour (`POST /api/upload-image`).
#[utoipa::path(
    post,
    path = "/api/upload-image",
    tag = "images",
    request_body = UploadImageRequest,
    responses(
        (status = 200, description = "Image stored", body = UploadImageResponse),
        (status = 400, description = "No image provided", body = ErrorResponse),
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<UploadImageResponse>, ServerError> {
    let req: UploadImageRequest = parse_json_body(&body)?;
    let image = req
        .image
        .filter(|i| !i.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("No image provided".into()))?;

    let uploaded = state.images.put(image).await?;
    info!(image_id = %uploaded.id, "image uploaded");

    Ok(Json(UploadImageResponse {
        url: state.config.image_url(&uploaded.url),
        id: uploaded.id,
    }))
}

/// Serve a stored image as PNG bytes (`GET /api/images/{id}`).
#[utoipa::path(
    get,
    path = "/api/images/{id}",
    tag = "images",
    params(("id" = String, Path, description = "Image id returned by the upload")),
    responses(
        (status = 200, description = "Decoded image bytes, served as image/png"),
        (status = 404, description = "Unknown or expired image", body = ErrorResponse),
    )
)]
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let payload = state.images.get(&id).await?;
    let bytes = decode_payload(&payload)?;
    debug!(image_id = %id, size = bytes.len(), "serving image");

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
