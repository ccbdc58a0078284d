//! Moments Server Library - photo ingestion and similarity reconciliation API
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod metadata_client;
pub mod multipart;
pub mod openapi;
pub mod recognition;
pub mod routes;
pub mod state;
pub mod storage;
pub mod validation;

pub use config::Config;
pub use db::{
    Facecam, InteractionFlags, MemoryPhotoStore, NewFacecam, NewPhoto, NewPhotoDetail, Photo,
    PhotoDetail, PhotoStore, PostgresPhotoStore, PreviewUrls, RepresentationKind, SimilarPhoto,
    SimilarUser, SimilarityLevel, StoreError, UserSimilarPhoto,
};
pub use error::ApiError;
pub use ingest::{FacecamIngested, FacecamUpload, Ingestor, PhotoIngested, PhotoUpload};
pub use metadata_client::{MetadataClient, MetadataClientError};
pub use openapi::ApiDoc;
pub use recognition::{Notification, RecognitionNotifier};
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
pub use storage::{ObjectStore, StorageError, StoredObject};
