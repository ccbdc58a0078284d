//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod metadata;
pub mod objects;
pub mod recognition;
pub mod upload;

pub use crate::state::AppState;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use metadata::{
    create_facecam_handler, create_photo_detail_handler, create_photo_handler,
    get_facecam_handler, get_photo_handler, set_interaction_flags_handler,
    update_facecam_asset_handler, InteractionFlagsRequest, InteractionFlagsResponse,
    PhotoWithDetails,
};
pub use objects::get_object_handler;
pub use recognition::{
    facecam_recognition_handler, photo_recognition_handler, FacecamRecognitionCallback,
    PhotoRecognitionCallback, RecognitionAppliedResponse,
};
pub use upload::{
    upload_facecam_handler, upload_photo_handler, FacecamUploadResponse, PhotoUploadResponse,
};
