//! Recognition callback handlers
//!
//! The external recognition process reports its results here. Each
//! callback carries a complete target set; the store reconciles the
//! persisted set against it atomically, together with any preview-URL
//! update for the same photo.
//!
//! A callback for a photo or facecam that no longer exists is logged
//! and dropped, not surfaced as an error: deletions racing recognition
//! are expected, not an incident.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{PreviewUrls, SimilarPhoto, SimilarUser, StoreError};
use crate::error::ApiError;
use crate::state::AppState;

/// Callback payload for one processed photo
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PhotoRecognitionCallback {
    pub photo_id: Uuid,
    /// Replacement preview URL, absent means keep the current value
    pub is_this_you_url: Option<String>,
    /// Replacement preview URL, absent means keep the current value
    pub your_moments_url: Option<String>,
    /// Complete target match set; an empty set clears every match
    pub similar_users: Vec<SimilarUser>,
}

/// Callback payload for one processed facecam
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FacecamRecognitionCallback {
    pub user_id: Uuid,
    /// Complete target match set for this user across all photos
    pub similar_photos: Vec<SimilarPhoto>,
}

#[derive(Serialize, ToSchema)]
pub struct RecognitionAppliedResponse {
    /// False when the callback target no longer exists
    pub applied: bool,
}

/// Apply a photo recognition callback
///
/// Reconciles the persisted match set of the photo against the carried
/// target set and updates preview URLs in the same atomic unit.
/// Idempotent: replaying a callback leaves the same state.
#[utoipa::path(
    post,
    path = "/internal/recognition/photos",
    tag = "Recognition",
    request_body = PhotoRecognitionCallback,
    responses(
        (status = 200, description = "Callback processed", body = RecognitionAppliedResponse),
        (status = 500, description = "Constraint violation or failed transaction")
    )
)]
pub async fn photo_recognition_handler(
    State(state): State<AppState>,
    Json(callback): Json<PhotoRecognitionCallback>,
) -> Result<Json<RecognitionAppliedResponse>, ApiError> {
    let preview = PreviewUrls {
        is_this_you_url: callback.is_this_you_url,
        your_moments_url: callback.your_moments_url,
    };

    match state
        .store
        .apply_photo_recognition(callback.photo_id, &preview, &callback.similar_users)
        .await
    {
        Ok(()) => Ok(Json(RecognitionAppliedResponse { applied: true })),
        Err(StoreError::NotFound(what)) => {
            tracing::info!(photo_id = %callback.photo_id, %what, "Dropping callback for missing photo");
            Ok(Json(RecognitionAppliedResponse { applied: false }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Apply a facecam recognition callback
///
/// Marks the facecam processed and reconciles the user's match set
/// across photos.
#[utoipa::path(
    post,
    path = "/internal/recognition/facecams",
    tag = "Recognition",
    request_body = FacecamRecognitionCallback,
    responses(
        (status = 200, description = "Callback processed", body = RecognitionAppliedResponse),
        (status = 500, description = "Constraint violation or failed transaction")
    )
)]
pub async fn facecam_recognition_handler(
    State(state): State<AppState>,
    Json(callback): Json<FacecamRecognitionCallback>,
) -> Result<Json<RecognitionAppliedResponse>, ApiError> {
    match state
        .store
        .apply_facecam_recognition(callback.user_id, &callback.similar_photos)
        .await
    {
        Ok(()) => Ok(Json(RecognitionAppliedResponse { applied: true })),
        Err(StoreError::NotFound(what)) => {
            tracing::info!(user_id = %callback.user_id, %what, "Dropping callback for missing facecam");
            Ok(Json(RecognitionAppliedResponse { applied: false }))
        }
        Err(e) => Err(e.into()),
    }
}
