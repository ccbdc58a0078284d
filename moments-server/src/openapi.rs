//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Moments ingestion API.

use utoipa::OpenApi;

use crate::db::{
    Facecam, FacecamAsset, InteractionFlags, NewFacecam, NewPhoto, NewPhotoDetail, Photo,
    PhotoDetail, RepresentationKind, SimilarPhoto, SimilarUser, SimilarityLevel, UserSimilarPhoto,
};
use crate::handlers::{
    FacecamRecognitionCallback, FacecamUploadResponse, HealthResponse, InteractionFlagsRequest,
    InteractionFlagsResponse, PhotoRecognitionCallback, PhotoUploadResponse, PhotoWithDetails,
    ReadyResponse, RecognitionAppliedResponse,
};
use crate::metadata_client::{
    CreateDetailResponse, CreateFacecamResponse, CreatePhotoRequest, CreatePhotoResponse,
    UpdateFacecamAssetResponse,
};

/// Moments Ingestion API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Moments - Photo Ingestion API",
        version = "0.1.0",
        description = r#"
## Photo ingestion and similarity reconciliation

The service ingests user-submitted photographs, derives an original and
a compressed representation, persists structured metadata, and
reconciles per-photo "similar user" match sets reported by an external
recognition process.

### How it works

1. **Upload** a photo via `POST /api/photos`; the response returns as
   soon as the original is stored and its metadata row exists
2. A **detached task** compresses the photo, stores the compressed
   copy, and records it as a second representation
3. The **recognition process** is notified and later reports its match
   set via `POST /internal/recognition/photos`
4. The reported target set **replaces** the persisted set atomically;
   user interaction flags on surviving matches are preserved
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Ingestion", description = "Multipart photo and facecam uploads"),
        (name = "Metadata", description = "Internal metadata store operations"),
        (name = "Recognition", description = "Callbacks from the recognition process"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::upload::upload_photo_handler,
        crate::handlers::upload::upload_facecam_handler,
        crate::handlers::metadata::create_photo_handler,
        crate::handlers::metadata::create_photo_detail_handler,
        crate::handlers::metadata::create_facecam_handler,
        crate::handlers::metadata::update_facecam_asset_handler,
        crate::handlers::metadata::get_photo_handler,
        crate::handlers::metadata::get_facecam_handler,
        crate::handlers::metadata::set_interaction_flags_handler,
        crate::handlers::recognition::photo_recognition_handler,
        crate::handlers::recognition::facecam_recognition_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            PhotoUploadResponse,
            FacecamUploadResponse,
            CreatePhotoRequest,
            CreatePhotoResponse,
            CreateDetailResponse,
            CreateFacecamResponse,
            UpdateFacecamAssetResponse,
            PhotoWithDetails,
            InteractionFlagsRequest,
            InteractionFlagsResponse,
            PhotoRecognitionCallback,
            FacecamRecognitionCallback,
            RecognitionAppliedResponse,
            Photo,
            NewPhoto,
            PhotoDetail,
            NewPhotoDetail,
            RepresentationKind,
            Facecam,
            NewFacecam,
            FacecamAsset,
            UserSimilarPhoto,
            SimilarUser,
            SimilarPhoto,
            SimilarityLevel,
            InteractionFlags,
        )
    )
)]
pub struct ApiDoc;
