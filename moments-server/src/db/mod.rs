//! Metadata store module
//!
//! Owns every persisted row of the pipeline: photos, their
//! representations, facecams, and the per-photo similarity match set.
//! Two backends sit behind one facade:
//!
//! - **PostgreSQL** (production): transactional, with per-photo
//!   advisory locking around reconciliation.
//! - **In-memory** (development fallback and tests): `DashMap`-backed,
//!   serialized per photo by shard entry locking.
//!
//! If `DATABASE_URL` is not set, the service falls back to the
//! in-memory backend (rows are lost on restart).

pub mod facecam;
mod memory;
pub mod photo;
mod postgres;
pub mod similar;

pub use facecam::{Facecam, FacecamAsset, NewFacecam};
pub use memory::MemoryPhotoStore;
pub use photo::{NewPhoto, NewPhotoDetail, Photo, PhotoDetail, RepresentationKind};
pub use postgres::PostgresPhotoStore;
pub use similar::{
    InteractionFlags, PreviewUrls, SimilarPhoto, SimilarUser, SimilarityLevel, UserSimilarPhoto,
};

use uuid::Uuid;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    Query(String),
}

/// Metadata store backend
enum StoreBackend {
    /// PostgreSQL storage (production)
    Postgres(PostgresPhotoStore),
    /// In-memory storage (development fallback)
    Memory(MemoryPhotoStore),
}

/// Unified metadata store for photos, facecams, and similarity edges.
pub struct PhotoStore {
    backend: StoreBackend,
}

impl PhotoStore {
    /// Create a store with a PostgreSQL backend, running migrations.
    pub async fn with_postgres(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let pg = PostgresPhotoStore::new(database_url, max_connections).await?;
        Ok(Self {
            backend: StoreBackend::Postgres(pg),
        })
    }

    /// Create a store with an in-memory backend (development and tests).
    pub fn in_memory() -> Self {
        Self {
            backend: StoreBackend::Memory(MemoryPhotoStore::new()),
        }
    }

    /// Create a store from the environment.
    ///
    /// Uses PostgreSQL if `DATABASE_URL` is set, otherwise falls back
    /// to in-memory storage.
    pub async fn from_env(max_connections: u32) -> Result<Self, StoreError> {
        match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => {
                tracing::info!("Using PostgreSQL metadata store");
                Self::with_postgres(&url, max_connections).await
            }
            _ => {
                tracing::warn!("DATABASE_URL not set, using in-memory metadata store");
                Ok(Self::in_memory())
            }
        }
    }

    /// Check if using persistent storage
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StoreBackend::Postgres(_))
    }

    /// Check database health (always Ok for memory backend)
    pub async fn health_check(&self) -> Result<(), StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.health_check().await,
            StoreBackend::Memory(_) => Ok(()),
        }
    }

    /// Transactionally insert a photo and its first representation.
    ///
    /// The detail row lands in the same transaction, so a photo is
    /// never observable without its original representation.
    pub async fn create_photo(
        &self,
        photo: NewPhoto,
        detail: NewPhotoDetail,
    ) -> Result<(Uuid, Uuid), StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.create_photo(photo, detail).await,
            StoreBackend::Memory(mem) => mem.create_photo(photo, detail),
        }
    }

    /// Insert an additional representation for an existing photo.
    pub async fn add_photo_detail(&self, detail: NewPhotoDetail) -> Result<Uuid, StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.add_photo_detail(detail).await,
            StoreBackend::Memory(mem) => mem.add_photo_detail(detail),
        }
    }

    pub async fn get_photo(&self, id: Uuid) -> Result<Option<Photo>, StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.get_photo(id).await,
            StoreBackend::Memory(mem) => Ok(mem.get_photo(id)),
        }
    }

    /// All representations of a photo, oldest first.
    pub async fn photo_details(&self, photo_id: Uuid) -> Result<Vec<PhotoDetail>, StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.photo_details(photo_id).await,
            StoreBackend::Memory(mem) => Ok(mem.photo_details(photo_id)),
        }
    }

    /// Apply one recognition callback for a photo: update preview URLs
    /// and make the persisted match set equal to `target`, atomically.
    ///
    /// An empty `target` deletes every match row for the photo.
    pub async fn apply_photo_recognition(
        &self,
        photo_id: Uuid,
        preview: &PreviewUrls,
        target: &[SimilarUser],
    ) -> Result<(), StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => {
                pg.apply_photo_recognition(photo_id, preview, target).await
            }
            StoreBackend::Memory(mem) => mem.apply_photo_recognition(photo_id, preview, target),
        }
    }

    /// Current match set for a photo, ordered by user id.
    pub async fn similar_users(&self, photo_id: Uuid) -> Result<Vec<UserSimilarPhoto>, StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.similar_users(photo_id).await,
            StoreBackend::Memory(mem) => Ok(mem.similar_users(photo_id)),
        }
    }

    /// Overwrite the interaction flags on an existing match row.
    ///
    /// Returns false when no row exists for (photo, user).
    pub async fn set_interaction_flags(
        &self,
        photo_id: Uuid,
        user_id: Uuid,
        flags: InteractionFlags,
    ) -> Result<bool, StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => {
                pg.set_interaction_flags(photo_id, user_id, flags).await
            }
            StoreBackend::Memory(mem) => Ok(mem.set_interaction_flags(photo_id, user_id, flags)),
        }
    }

    /// Create or replace a user's facecam.
    pub async fn create_facecam(&self, facecam: NewFacecam) -> Result<Uuid, StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.create_facecam(facecam).await,
            StoreBackend::Memory(mem) => Ok(mem.create_facecam(facecam)),
        }
    }

    pub async fn get_facecam(&self, user_id: Uuid) -> Result<Option<Facecam>, StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.get_facecam(user_id).await,
            StoreBackend::Memory(mem) => Ok(mem.get_facecam(user_id)),
        }
    }

    /// Re-point a user's facecam at a different stored copy.
    ///
    /// Used by the detached compression path so the row references the
    /// compressed object instead of the transiently stored original.
    pub async fn update_facecam_asset(
        &self,
        user_id: Uuid,
        asset: FacecamAsset,
    ) -> Result<(), StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.update_facecam_asset(user_id, &asset).await,
            StoreBackend::Memory(mem) => mem.update_facecam_asset(user_id, asset),
        }
    }

    /// Apply one recognition callback for a facecam owner: mark the
    /// facecam processed and reconcile the per-user match set.
    pub async fn apply_facecam_recognition(
        &self,
        user_id: Uuid,
        target: &[SimilarPhoto],
    ) -> Result<(), StoreError> {
        match &self.backend {
            StoreBackend::Postgres(pg) => pg.apply_facecam_recognition(user_id, target).await,
            StoreBackend::Memory(mem) => mem.apply_facecam_recognition(user_id, target),
        }
    }
}

impl std::fmt::Debug for PhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            StoreBackend::Postgres(_) => "PostgreSQL",
            StoreBackend::Memory(_) => "Memory",
        };
        f.debug_struct("PhotoStore").field("backend", &backend).finish()
    }
}
