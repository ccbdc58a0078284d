//! Internal metadata handlers
//!
//! JSON endpoints consumed by the ingestion side (possibly a separate
//! deployment through `MetadataClient::remote`) and by operators. They
//! write straight to the metadata store.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{
    Facecam, FacecamAsset, InteractionFlags, NewFacecam, NewPhotoDetail, Photo, PhotoDetail,
    UserSimilarPhoto,
};
use crate::error::ApiError;
use crate::metadata_client::{
    CreateDetailResponse, CreateFacecamResponse, CreatePhotoRequest, CreatePhotoResponse,
    UpdateFacecamAssetResponse,
};
use crate::state::AppState;

/// A photo with its representations and current match set
#[derive(Serialize, ToSchema)]
pub struct PhotoWithDetails {
    pub photo: Photo,
    pub details: Vec<PhotoDetail>,
    pub similar_users: Vec<UserSimilarPhoto>,
}

/// Create a photo together with its original representation
///
/// Both rows land in one transaction: a photo is never observable
/// without its original representation.
#[utoipa::path(
    post,
    path = "/internal/photos",
    tag = "Metadata",
    request_body = CreatePhotoRequest,
    responses(
        (status = 200, description = "Photo and detail created", body = CreatePhotoResponse),
        (status = 500, description = "Constraint violation or failed transaction")
    )
)]
pub async fn create_photo_handler(
    State(state): State<AppState>,
    Json(request): Json<CreatePhotoRequest>,
) -> Result<Json<CreatePhotoResponse>, ApiError> {
    let (photo_id, detail_id) = state.store.create_photo(request.photo, request.detail).await?;
    Ok(Json(CreatePhotoResponse { photo_id, detail_id }))
}

/// Add a representation to an existing photo
///
/// Used by the detached compression path to record the COMPRESSED copy.
#[utoipa::path(
    post,
    path = "/internal/photo-details",
    tag = "Metadata",
    request_body = NewPhotoDetail,
    responses(
        (status = 200, description = "Detail row created", body = CreateDetailResponse),
        (status = 404, description = "Referenced photo does not exist")
    )
)]
pub async fn create_photo_detail_handler(
    State(state): State<AppState>,
    Json(detail): Json<NewPhotoDetail>,
) -> Result<Json<CreateDetailResponse>, ApiError> {
    let detail_id = state.store.add_photo_detail(detail).await?;
    Ok(Json(CreateDetailResponse { detail_id }))
}

/// Create or replace a user's facecam
#[utoipa::path(
    post,
    path = "/internal/facecams",
    tag = "Metadata",
    request_body = NewFacecam,
    responses(
        (status = 200, description = "Facecam created or replaced", body = CreateFacecamResponse)
    )
)]
pub async fn create_facecam_handler(
    State(state): State<AppState>,
    Json(facecam): Json<NewFacecam>,
) -> Result<Json<CreateFacecamResponse>, ApiError> {
    let facecam_id = state.store.create_facecam(facecam).await?;
    Ok(Json(CreateFacecamResponse { facecam_id }))
}

/// Re-point a user's facecam at a different stored copy
///
/// Used by the detached compression path to record the compressed
/// object's key and URL on the row.
#[utoipa::path(
    put,
    path = "/internal/facecams/{user_id}/asset",
    tag = "Metadata",
    params(("user_id" = Uuid, Path, description = "Owning user id")),
    request_body = FacecamAsset,
    responses(
        (status = 200, description = "Facecam row updated", body = UpdateFacecamAssetResponse),
        (status = 404, description = "No facecam for this user")
    )
)]
pub async fn update_facecam_asset_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(asset): Json<FacecamAsset>,
) -> Result<Json<UpdateFacecamAssetResponse>, ApiError> {
    state.store.update_facecam_asset(user_id, asset).await?;
    Ok(Json(UpdateFacecamAssetResponse { updated: true }))
}

/// Fetch a photo with its representations and match set
#[utoipa::path(
    get,
    path = "/internal/photos/{id}",
    tag = "Metadata",
    params(("id" = Uuid, Path, description = "Photo id")),
    responses(
        (status = 200, description = "Photo found", body = PhotoWithDetails),
        (status = 404, description = "No such photo")
    )
)]
pub async fn get_photo_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PhotoWithDetails>, ApiError> {
    let photo = state
        .store
        .get_photo(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("photo {id}")))?;
    let details = state.store.photo_details(id).await?;
    let similar_users = state.store.similar_users(id).await?;

    Ok(Json(PhotoWithDetails {
        photo,
        details,
        similar_users,
    }))
}

/// Fetch a user's facecam
#[utoipa::path(
    get,
    path = "/internal/facecams/{user_id}",
    tag = "Metadata",
    params(("user_id" = Uuid, Path, description = "Owning user id")),
    responses(
        (status = 200, description = "Facecam found", body = Facecam),
        (status = 404, description = "No facecam for this user")
    )
)]
pub async fn get_facecam_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Facecam>, ApiError> {
    let facecam = state
        .store
        .get_facecam(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("facecam for user {user_id}")))?;
    Ok(Json(facecam))
}

/// Request body for overwriting interaction flags on a match row
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct InteractionFlagsRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub flags: InteractionFlags,
}

#[derive(Serialize, ToSchema)]
pub struct InteractionFlagsResponse {
    pub updated: bool,
}

/// Overwrite the interaction flags on an existing match row
///
/// Flags are user-owned state; reconciliation preserves them, this is
/// the only write path that changes them.
#[utoipa::path(
    put,
    path = "/internal/photos/{id}/interactions",
    tag = "Metadata",
    params(("id" = Uuid, Path, description = "Photo id")),
    request_body = InteractionFlagsRequest,
    responses(
        (status = 200, description = "Flags updated", body = InteractionFlagsResponse),
        (status = 404, description = "No match row for (photo, user)")
    )
)]
pub async fn set_interaction_flags_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<InteractionFlagsRequest>,
) -> Result<Json<InteractionFlagsResponse>, ApiError> {
    let updated = state
        .store
        .set_interaction_flags(id, request.user_id, request.flags)
        .await?;
    if !updated {
        return Err(ApiError::not_found(format!(
            "match row for photo {id} and user {}",
            request.user_id
        )));
    }
    Ok(Json(InteractionFlagsResponse { updated }))
}
