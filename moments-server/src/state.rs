//! Application state module
//!
//! Defines shared state accessible across all request handlers. All
//! clients held here are long-lived and safe for concurrent use across
//! requests.

use std::sync::Arc;

use moments_core::Compressor;

use crate::config::Config;
use crate::db::PhotoStore;
use crate::error::ApiError;
use crate::ingest::Ingestor;
use crate::metadata_client::MetadataClient;
use crate::recognition::RecognitionNotifier;
use crate::storage::ObjectStore;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Metadata store for photos, facecams, and similarity edges
    pub store: Arc<PhotoStore>,
    /// Object store for raw bytes
    pub storage: Arc<ObjectStore>,
    /// Ingestion coordinator (fast path + detached slow path)
    pub ingestor: Arc<Ingestor>,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Build production state from configuration.
    ///
    /// The metadata client goes remote when `METADATA_BASE_URL` points
    /// at a separate deployment, otherwise it calls the local store
    /// in-process. Same for the recognition notifier.
    pub async fn from_config(config: &Config) -> Result<Self, ApiError> {
        let store = Arc::new(
            PhotoStore::from_env(config.database_max_connections)
                .await
                .map_err(|e| ApiError::Infrastructure(e.to_string()))?,
        );

        let storage = Arc::new(
            ObjectStore::filesystem(
                &config.storage_root,
                &config.public_base_url,
                &config.url_signing_secret,
                config.presign_ttl_secs,
            )
            .map_err(|e| ApiError::Infrastructure(e.to_string()))?,
        );

        let metadata = match &config.metadata_base_url {
            Some(base_url) => Arc::new(
                MetadataClient::remote(base_url, config.rpc_timeout())
                    .map_err(|e| ApiError::Infrastructure(e.to_string()))?,
            ),
            None => Arc::new(MetadataClient::local(Arc::clone(&store))),
        };

        let recognition = match &config.recognition_base_url {
            Some(base_url) => Arc::new(RecognitionNotifier::remote(base_url, config.rpc_timeout())),
            None => Arc::new(RecognitionNotifier::disabled()),
        };

        let ingestor = Ingestor::new(
            Arc::clone(&storage),
            metadata,
            recognition,
            Compressor::new(config.compress_quality),
            config.work_dir.clone(),
            config.detached_timeout(),
        );

        Ok(Self {
            store,
            storage,
            ingestor,
            max_file_size: config.max_file_size_mb * 1024 * 1024,
        })
    }

    /// In-memory state wired through the local metadata client, with a
    /// recording recognition notifier (integration tests).
    pub fn in_memory() -> Self {
        let store = Arc::new(PhotoStore::in_memory());
        let storage = Arc::new(ObjectStore::in_memory("http://127.0.0.1:3000/objects"));
        let recognition = Arc::new(RecognitionNotifier::recording());
        let work_dir = std::env::temp_dir().join("moments-work");

        let ingestor = Ingestor::new(
            Arc::clone(&storage),
            Arc::new(MetadataClient::local(Arc::clone(&store))),
            recognition,
            Compressor::default(),
            work_dir,
            std::time::Duration::from_secs(30),
        );

        Self {
            store,
            storage,
            ingestor,
            max_file_size: crate::validation::DEFAULT_MAX_FILE_SIZE,
        }
    }
}
