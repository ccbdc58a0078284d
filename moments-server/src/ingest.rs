//! Ingestion coordinator.
//!
//! Orchestrates the synchronous fast path (buffer once, fingerprint,
//! store the original, create metadata) and the detached slow path
//! (compress, store the compressed copy, add its detail row, notify
//! recognition). The fast path propagates every error to the caller;
//! the slow path owns its failure domain and only logs.
//!
//! The upload buffer is read exactly once from the request and treated
//! as read-only afterwards: checksum, decode, and both store writes
//! all operate over the same bytes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moments_core::{fingerprint, Compressor, Fingerprint};
use uuid::Uuid;

use crate::db::{FacecamAsset, NewFacecam, NewPhoto, NewPhotoDetail, RepresentationKind};
use crate::error::ApiError;
use crate::metadata_client::MetadataClient;
use crate::recognition::RecognitionNotifier;
use crate::storage::ObjectStore;

const PHOTO_PREFIX: &str = "photo";
const FACECAM_PREFIX: &str = "facecam";

/// A validated photo upload, fully buffered.
#[derive(Debug)]
pub struct PhotoUpload {
    pub creator_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub price: i64,
    pub price_str: String,
    pub bytes: Vec<u8>,
}

/// A validated facecam upload, fully buffered.
#[derive(Debug)]
pub struct FacecamUpload {
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Fast-path result returned to the client.
#[derive(Debug, Clone)]
pub struct PhotoIngested {
    pub photo_id: Uuid,
    pub detail_id: Uuid,
    pub url: String,
    pub checksum: String,
}

#[derive(Debug, Clone)]
pub struct FacecamIngested {
    pub facecam_id: Uuid,
    pub url: String,
    pub checksum: String,
}

pub struct Ingestor {
    storage: Arc<ObjectStore>,
    metadata: Arc<MetadataClient>,
    recognition: Arc<RecognitionNotifier>,
    compressor: Compressor,
    work_dir: PathBuf,
    detached_timeout: Duration,
}

impl Ingestor {
    pub fn new(
        storage: Arc<ObjectStore>,
        metadata: Arc<MetadataClient>,
        recognition: Arc<RecognitionNotifier>,
        compressor: Compressor,
        work_dir: PathBuf,
        detached_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage,
            metadata,
            recognition,
            compressor,
            work_dir,
            detached_timeout,
        })
    }

    /// Fast path for a photo upload.
    ///
    /// Fingerprinting happens before any store write, so an
    /// undecodable upload leaves no partial object behind. If the
    /// metadata create fails after the object is stored, the object is
    /// orphaned; that gap is logged with its key so an out-of-band
    /// sweep can find it.
    pub async fn ingest_photo(
        self: &Arc<Self>,
        upload: PhotoUpload,
    ) -> Result<PhotoIngested, ApiError> {
        let print = fingerprint(&upload.bytes)?;

        let stored = self
            .storage
            .put(
                PHOTO_PREFIX,
                &upload.file_name,
                &upload.bytes,
                print.kind.content_type(),
            )
            .await?;

        let photo_id = Uuid::new_v4();
        let photo = NewPhoto {
            id: photo_id,
            creator_id: upload.creator_id,
            title: upload.title.clone(),
            collection_url: stored.url.clone(),
            price: upload.price,
            price_str: upload.price_str.clone(),
            original_at: Utc::now(),
        };
        let detail = detail_row(
            photo_id,
            &upload.file_name,
            &stored.key,
            &stored.url,
            &print,
            RepresentationKind::Collection,
        );

        let (photo_id, detail_id) = match self.metadata.create_photo(photo, detail).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(
                    key = %stored.key,
                    error = %e,
                    "Metadata create failed, stored object is orphaned"
                );
                return Err(e.into());
            }
        };

        tracing::info!(%photo_id, %detail_id, size = print.size, "Photo ingested");

        self.spawn_detached(photo_id, upload.bytes, move |this, bytes| async move {
            this.finish_photo(photo_id, bytes).await
        });

        Ok(PhotoIngested {
            photo_id,
            detail_id,
            url: stored.url,
            checksum: print.checksum,
        })
    }

    /// Fast path for a facecam upload. One facecam per user: a repeat
    /// upload replaces the previous row and resets its processed flag.
    pub async fn ingest_facecam(
        self: &Arc<Self>,
        upload: FacecamUpload,
    ) -> Result<FacecamIngested, ApiError> {
        let print = fingerprint(&upload.bytes)?;

        let stored = self
            .storage
            .put(
                FACECAM_PREFIX,
                &upload.file_name,
                &upload.bytes,
                print.kind.content_type(),
            )
            .await?;

        let facecam = NewFacecam {
            id: Uuid::new_v4(),
            user_id: upload.user_id,
            title: upload.title.clone(),
            file_name: upload.file_name.clone(),
            file_key: stored.key.clone(),
            size: print.size as i64,
            checksum: print.checksum.clone(),
            url: stored.url.clone(),
            original_at: Utc::now(),
        };

        let facecam_id = match self.metadata.create_facecam(facecam).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    key = %stored.key,
                    error = %e,
                    "Metadata create failed, stored object is orphaned"
                );
                return Err(e.into());
            }
        };

        let user_id = upload.user_id;
        tracing::info!(%facecam_id, %user_id, "Facecam ingested");

        let original_key = stored.key.clone();
        self.spawn_detached(facecam_id, upload.bytes, move |this, bytes| async move {
            this.finish_facecam(user_id, original_key, bytes).await
        });

        Ok(FacecamIngested {
            facecam_id,
            url: stored.url,
            checksum: print.checksum,
        })
    }

    /// Schedule slow-path work on a background task with its own
    /// timeout, decoupled from the request's lifetime. A disconnecting
    /// client cannot cancel it.
    fn spawn_detached<F, Fut>(self: &Arc<Self>, id: Uuid, bytes: Vec<u8>, work: F)
    where
        F: FnOnce(Arc<Self>, Vec<u8>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let this = Arc::clone(self);
        let deadline = self.detached_timeout;
        tokio::spawn(async move {
            if tokio::time::timeout(deadline, work(this, bytes)).await.is_err() {
                tracing::error!(%id, "Detached ingestion stage timed out");
            }
        });
    }

    /// Slow path for a photo: compress, store the compressed copy, add
    /// its detail row, delete the transient file, notify recognition.
    ///
    /// Failures are logged with the photo id and stage, never
    /// propagated, and never re-run the fast path.
    pub async fn finish_photo(self: Arc<Self>, photo_id: Uuid, bytes: Vec<u8>) {
        let Some((stored, print)) = self.compress_and_store(photo_id, PHOTO_PREFIX, bytes).await
        else {
            return;
        };

        let file_name = stored.key.rsplit('/').next().unwrap_or(&stored.key);
        let detail = detail_row(
            photo_id,
            file_name,
            &stored.key,
            &stored.url,
            &print,
            RepresentationKind::Compressed,
        );
        if let Err(e) = self.metadata.add_photo_detail(detail).await {
            tracing::error!(%photo_id, stage = "metadata_update", error = %e, "Detached stage failed");
            return;
        }

        tracing::info!(%photo_id, size = print.size, "Compressed representation recorded");
        self.recognition.notify_photo(photo_id, &stored.url).await;
    }

    /// Slow path for a facecam: compress, store the compressed copy,
    /// re-point the row at it, delete the superseded original, notify
    /// recognition.
    pub async fn finish_facecam(self: Arc<Self>, user_id: Uuid, original_key: String, bytes: Vec<u8>) {
        let Some((stored, print)) = self.compress_and_store(user_id, FACECAM_PREFIX, bytes).await
        else {
            return;
        };

        let file_name = stored.key.rsplit('/').next().unwrap_or(&stored.key).to_string();
        let asset = FacecamAsset {
            file_name,
            file_key: stored.key.clone(),
            size: print.size as i64,
            checksum: print.checksum.clone(),
            url: stored.url.clone(),
        };
        if let Err(e) = self.metadata.update_facecam_asset(user_id, asset).await {
            tracing::error!(%user_id, stage = "metadata_update", error = %e, "Detached stage failed");
            return;
        }

        // The row now references the compressed copy; the original
        // would otherwise sit in the store unreferenced forever.
        if let Err(e) = self.storage.delete(&original_key).await {
            tracing::warn!(%user_id, key = %original_key, error = %e, "Superseded original not deleted");
        }

        tracing::info!(%user_id, size = print.size, "Compressed facecam recorded");
        self.recognition.notify_facecam(user_id, &stored.url).await;
    }

    /// Shared compression stage: re-encode off the async runtime, store
    /// the result, delete the transient file.
    async fn compress_and_store(
        &self,
        id: Uuid,
        prefix: &str,
        bytes: Vec<u8>,
    ) -> Option<(crate::storage::StoredObject, Fingerprint)> {
        let compressor = self.compressor;
        let work_dir = self.work_dir.clone();

        // CPU-bound re-encode must not block the async runtime.
        let compressed = match tokio::task::spawn_blocking(move || {
            compressor.compress(&bytes, &work_dir)
        })
        .await
        {
            Ok(Ok(file)) => file,
            Ok(Err(e)) => {
                tracing::error!(%id, stage = "compress", error = %e, "Detached stage failed");
                return None;
            }
            Err(e) => {
                tracing::error!(%id, stage = "compress", error = %e, "Compression task panicked");
                return None;
            }
        };

        let compressed_bytes = match tokio::fs::read(&compressed.path).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(%id, stage = "reopen", error = %e, "Detached stage failed");
                return None;
            }
        };

        let print = match fingerprint(&compressed_bytes) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(%id, stage = "fingerprint", error = %e, "Detached stage failed");
                return None;
            }
        };

        let stored = match self
            .storage
            .put(prefix, &compressed.file_name, &compressed_bytes, print.kind.content_type())
            .await
        {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(%id, stage = "store", error = %e, "Detached stage failed");
                return None;
            }
        };

        // Disk usage only; correctness does not depend on this delete.
        if let Err(e) = tokio::fs::remove_file(&compressed.path).await {
            tracing::warn!(%id, file = %compressed.path.display(), error = %e, "Transient file not deleted");
        }

        Some((stored, print))
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("work_dir", &self.work_dir)
            .field("detached_timeout", &self.detached_timeout)
            .finish()
    }
}

fn detail_row(
    photo_id: Uuid,
    file_name: &str,
    key: &str,
    url: &str,
    print: &Fingerprint,
    kind: RepresentationKind,
) -> NewPhotoDetail {
    NewPhotoDetail {
        photo_id,
        file_name: file_name.to_string(),
        file_key: key.to_string(),
        size: print.size as i64,
        format: print.kind.as_str().to_string(),
        checksum: print.checksum.clone(),
        width: print.width as i32,
        height: print.height as i32,
        url: url.to_string(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PhotoStore;
    use std::io::Cursor;

    fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    fn test_ingestor(store: Arc<PhotoStore>) -> (Arc<Ingestor>, Arc<ObjectStore>, Arc<RecognitionNotifier>) {
        let storage = Arc::new(ObjectStore::in_memory("http://test/objects"));
        let recognition = Arc::new(RecognitionNotifier::recording());
        let work_dir = std::env::temp_dir().join(format!("moments-test-{}", Uuid::new_v4().simple()));
        let ingestor = Ingestor::new(
            Arc::clone(&storage),
            Arc::new(MetadataClient::local(store)),
            Arc::clone(&recognition),
            Compressor::default(),
            work_dir,
            Duration::from_secs(30),
        );
        (ingestor, storage, recognition)
    }

    fn photo_upload(bytes: Vec<u8>) -> PhotoUpload {
        PhotoUpload {
            creator_id: Uuid::new_v4(),
            title: "Beach day".into(),
            file_name: "beach.jpg".into(),
            price: 1500,
            price_str: "Rp15.000".into(),
            bytes,
        }
    }

    #[tokio::test]
    async fn test_fast_path_stores_original_and_creates_metadata() {
        let store = Arc::new(PhotoStore::in_memory());
        let (ingestor, storage, _) = test_ingestor(Arc::clone(&store));

        let bytes = sample_jpeg(640, 480);
        let expected_checksum = fingerprint(&bytes).unwrap().checksum.clone();
        let out = ingestor.ingest_photo(photo_upload(bytes)).await.unwrap();

        assert_eq!(out.checksum, expected_checksum);
        assert!(storage.put_count() >= 1);

        let photo = store.get_photo(out.photo_id).await.unwrap().unwrap();
        assert_eq!(photo.title, "Beach day");
        assert!(photo.is_this_you_url.is_none());

        let details = store.photo_details(out.photo_id).await.unwrap();
        assert_eq!(details[0].kind, RepresentationKind::Collection);
        assert_eq!(details[0].checksum, out.checksum);
        assert_eq!((details[0].width, details[0].height), (640, 480));
    }

    #[tokio::test]
    async fn test_undecodable_upload_rejected_before_any_store_write() {
        let store = Arc::new(PhotoStore::in_memory());
        let (ingestor, storage, _) = test_ingestor(store);

        let err = ingestor
            .ingest_photo(photo_upload(b"text pretending to be a jpeg".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::UnsupportedFormat(_)));
        assert_eq!(storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_path_adds_compressed_detail_and_notifies() {
        let store = Arc::new(PhotoStore::in_memory());
        let (ingestor, _, recognition) = test_ingestor(Arc::clone(&store));

        let bytes = sample_jpeg(800, 600);
        let out = ingestor.ingest_photo(photo_upload(bytes.clone())).await.unwrap();

        // Drive the detached stage to completion deterministically.
        Arc::clone(&ingestor).finish_photo(out.photo_id, bytes).await;

        let details = store.photo_details(out.photo_id).await.unwrap();
        let kinds: Vec<_> = details.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&RepresentationKind::Collection));
        assert!(kinds.contains(&RepresentationKind::Compressed));

        let compressed = details
            .iter()
            .find(|d| d.kind == RepresentationKind::Compressed)
            .unwrap();
        assert_eq!(compressed.format, "JPG");
        assert_eq!((compressed.width, compressed.height), (800, 600));

        let recorded = recognition.recorded();
        assert!(recorded
            .iter()
            .any(|n| matches!(n, crate::recognition::Notification::Photo { photo_id, .. } if *photo_id == out.photo_id)));
    }

    #[tokio::test]
    async fn test_slow_path_failure_leaves_original_valid() {
        let store = Arc::new(PhotoStore::in_memory());
        let (ingestor, _, recognition) = test_ingestor(Arc::clone(&store));

        let out = ingestor
            .ingest_photo(photo_upload(sample_jpeg(100, 100)))
            .await
            .unwrap();

        // Undecodable buffer makes the compression stage fail.
        Arc::clone(&ingestor)
            .finish_photo(out.photo_id, b"garbage".to_vec())
            .await;

        let details = store.photo_details(out.photo_id).await.unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].kind, RepresentationKind::Collection);
        assert!(recognition.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_facecam_ingest_replaces_previous_upload() {
        let store = Arc::new(PhotoStore::in_memory());
        let (ingestor, _, recognition) = test_ingestor(Arc::clone(&store));
        let user_id = Uuid::new_v4();

        let first = ingestor
            .ingest_facecam(FacecamUpload {
                user_id,
                title: "me".into(),
                file_name: "me.jpg".into(),
                bytes: sample_jpeg(200, 200),
            })
            .await
            .unwrap();

        let bytes = sample_jpeg(300, 300);
        let second = ingestor
            .ingest_facecam(FacecamUpload {
                user_id,
                title: "me again".into(),
                file_name: "me2.jpg".into(),
                bytes: bytes.clone(),
            })
            .await
            .unwrap();

        assert_ne!(first.facecam_id, second.facecam_id);
        let facecam = store.get_facecam(user_id).await.unwrap().unwrap();
        assert_eq!(facecam.id, second.facecam_id);
        assert!(!facecam.is_processed);

        Arc::clone(&ingestor)
            .finish_facecam(user_id, facecam.file_key.clone(), bytes)
            .await;
        assert!(recognition
            .recorded()
            .iter()
            .any(|n| matches!(n, crate::recognition::Notification::Facecam { user_id: u, .. } if *u == user_id)));
    }

    #[tokio::test]
    async fn test_facecam_slow_path_repoints_row_at_compressed_copy() {
        let store = Arc::new(PhotoStore::in_memory());
        let (ingestor, storage, _) = test_ingestor(Arc::clone(&store));
        let user_id = Uuid::new_v4();

        let bytes = sample_jpeg(400, 300);
        ingestor
            .ingest_facecam(FacecamUpload {
                user_id,
                title: "me".into(),
                file_name: "me.jpg".into(),
                bytes: bytes.clone(),
            })
            .await
            .unwrap();

        let original = store.get_facecam(user_id).await.unwrap().unwrap();
        Arc::clone(&ingestor)
            .finish_facecam(user_id, original.file_key.clone(), bytes)
            .await;

        // The row must reference the compressed copy, not the original.
        let updated = store.get_facecam(user_id).await.unwrap().unwrap();
        assert_ne!(updated.file_key, original.file_key);
        assert_ne!(updated.checksum, original.checksum);

        let compressed_bytes = storage.get(&updated.file_key).await.unwrap();
        let print = fingerprint(&compressed_bytes).unwrap();
        assert_eq!(print.checksum, updated.checksum);
        assert_eq!(print.size as i64, updated.size);

        // The superseded original no longer occupies the store.
        assert!(storage.get(&original.file_key).await.is_err());
    }
}
