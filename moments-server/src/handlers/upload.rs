//! Upload handlers
//!
//! Handle POST /api/photos and POST /api/facecams multipart uploads.
//! The response is sent as soon as the fast path completes; the
//! compressed representation lands later via the detached path.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::ingest::{FacecamUpload, PhotoUpload};
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Response for a successful photo upload
#[derive(Serialize, ToSchema)]
pub struct PhotoUploadResponse {
    /// Identifier of the created photo
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub photo_id: Uuid,
    /// Identifier of the original representation row
    pub detail_id: Uuid,
    /// Signed retrieval URL of the stored original
    pub url: String,
    /// Hex-encoded SHA3-256 over the stored bytes
    #[schema(example = "a1b2c3d4...")]
    pub checksum: String,
}

/// Response for a successful facecam upload
#[derive(Serialize, ToSchema)]
pub struct FacecamUploadResponse {
    /// Identifier of the created (or replacing) facecam
    pub facecam_id: Uuid,
    /// Signed retrieval URL of the stored original
    pub url: String,
    /// Hex-encoded SHA3-256 over the stored bytes
    pub checksum: String,
}

/// Upload a photo
///
/// Accepts multipart/form-data with:
/// - **file** (required): the image to ingest (JPEG, PNG, GIF, WebP)
/// - **creator_id** (required): UUID of the uploading creator
/// - **title** (optional): display title, defaults to the file name
/// - **price** (optional): integer price, defaults to 0
/// - **price_str** (optional): display price
#[utoipa::path(
    post,
    path = "/api/photos",
    tag = "Ingestion",
    request_body(
        content_type = "multipart/form-data",
        description = "Photo file plus scalar fields"
    ),
    responses(
        (status = 200, description = "Photo ingested, compression scheduled", body = PhotoUploadResponse),
        (status = 400, description = "Missing file, invalid fields, or undecodable image"),
        (status = 413, description = "File too large"),
        (status = 503, description = "Object store or metadata service unavailable")
    )
)]
pub async fn upload_photo_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PhotoUploadResponse>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;

    // Move the buffer out of the parsed form; a 25 MB upload is not
    // copied again on its way into the ingestor.
    let file = fields.take_file()?;
    let creator_id = fields.require_uuid("creator_id")?;
    let file_name = file.file_name.unwrap_or_else(|| "upload.bin".to_string());
    let title = fields
        .get_text("title")
        .map(str::to_string)
        .unwrap_or_else(|| file_name.clone());

    let upload = PhotoUpload {
        creator_id,
        title,
        file_name,
        price: fields.get_i64("price")?,
        price_str: fields.get_text("price_str").unwrap_or_default().to_string(),
        bytes: file.data,
    };

    let out = state.ingestor.ingest_photo(upload).await?;

    Ok(Json(PhotoUploadResponse {
        photo_id: out.photo_id,
        detail_id: out.detail_id,
        url: out.url,
        checksum: out.checksum,
    }))
}

/// Upload a facecam
///
/// Accepts multipart/form-data with:
/// - **file** (required): the reference face image
/// - **user_id** (required): UUID of the owning user
/// - **title** (optional): display title
///
/// A repeat upload for the same user replaces the previous facecam and
/// resets its processed flag.
#[utoipa::path(
    post,
    path = "/api/facecams",
    tag = "Ingestion",
    request_body(
        content_type = "multipart/form-data",
        description = "Facecam file plus scalar fields"
    ),
    responses(
        (status = 200, description = "Facecam ingested", body = FacecamUploadResponse),
        (status = 400, description = "Missing file, invalid fields, or undecodable image"),
        (status = 413, description = "File too large"),
        (status = 503, description = "Object store or metadata service unavailable")
    )
)]
pub async fn upload_facecam_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FacecamUploadResponse>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;

    let file = fields.take_file()?;
    let user_id = fields.require_uuid("user_id")?;
    let file_name = file.file_name.unwrap_or_else(|| "facecam.bin".to_string());
    let title = fields
        .get_text("title")
        .map(str::to_string)
        .unwrap_or_else(|| file_name.clone());

    let upload = FacecamUpload {
        user_id,
        title,
        file_name,
        bytes: file.data,
    };

    let out = state.ingestor.ingest_facecam(upload).await?;

    Ok(Json(FacecamUploadResponse {
        facecam_id: out.facecam_id,
        url: out.url,
        checksum: out.checksum,
    }))
}
