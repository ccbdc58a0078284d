//! Object store module
//!
//! Holds the raw photo bytes under opaque keys. Metadata rows never
//! embed bytes, only keys and URLs minted here. Two backends sit
//! behind one facade:
//!
//! - **Filesystem** (production default): objects under a root
//!   directory, addressed by key, served through signed expiring URLs.
//! - **In-memory** (tests): `DashMap`-backed, with a write counter so
//!   tests can assert that a rejected upload never touched the store.

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

use sha3::{Digest, Sha3_256};
use uuid::Uuid;

/// Object store errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Object {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A stored object as seen by the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub size: i64,
    pub content_type: String,
}

/// Generate an object key: `{prefix}/{random}_{file_name}`.
///
/// The random component keeps same-named uploads from colliding while
/// the trailing file name keeps keys debuggable.
fn object_key(prefix: &str, file_name: &str) -> String {
    let mut random = Uuid::new_v4().simple().to_string();
    random.truncate(31);
    format!("{prefix}/{random}_{file_name}")
}

fn sign(secret: &str, key: &str, expires: i64) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(secret.as_bytes());
    hasher.update(key.as_bytes());
    hasher.update(expires.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Build a signed expiring URL for an object key.
fn signed_url(base_url: &str, secret: &str, key: &str, ttl_secs: u64) -> String {
    let expires = chrono::Utc::now().timestamp() + ttl_secs as i64;
    let sig = sign(secret, key, expires);
    format!("{}/{key}?expires={expires}&sig={sig}", base_url.trim_end_matches('/'))
}

/// Object store backend
enum StorageBackend {
    Filesystem(FsObjectStore),
    Memory(MemoryObjectStore),
}

/// Unified object store for photo and facecam bytes.
pub struct ObjectStore {
    backend: StorageBackend,
    base_url: String,
    secret: String,
    ttl_secs: u64,
}

impl ObjectStore {
    /// Create a filesystem-backed store rooted at `root`.
    pub fn filesystem(
        root: impl Into<std::path::PathBuf>,
        base_url: impl Into<String>,
        secret: impl Into<String>,
        ttl_secs: u64,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            backend: StorageBackend::Filesystem(FsObjectStore::new(root)?),
            base_url: base_url.into(),
            secret: secret.into(),
            ttl_secs,
        })
    }

    /// Create an in-memory store (tests).
    pub fn in_memory(base_url: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Memory(MemoryObjectStore::new()),
            base_url: base_url.into(),
            secret: "test-secret".into(),
            ttl_secs: 3600,
        }
    }

    /// Store `bytes` under a fresh key in `prefix` and return the
    /// stored object with its signed URL.
    pub async fn put(
        &self,
        prefix: &str,
        file_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let key = object_key(prefix, file_name);
        match &self.backend {
            StorageBackend::Filesystem(fs) => fs.put(&key, bytes).await?,
            StorageBackend::Memory(mem) => mem.put(&key, bytes),
        }
        Ok(StoredObject {
            url: self.presigned_url(&key, None),
            size: bytes.len() as i64,
            content_type: content_type.to_string(),
            key,
        })
    }

    /// Signed expiring URL for an existing key. A per-call TTL
    /// overrides the configured default.
    pub fn presigned_url(&self, key: &str, ttl_secs: Option<u64>) -> String {
        signed_url(
            &self.base_url,
            &self.secret,
            key,
            ttl_secs.unwrap_or(self.ttl_secs),
        )
    }

    /// Check a presigned URL's signature and expiry for a key.
    pub fn verify_signature(&self, key: &str, expires: i64, sig: &str) -> bool {
        expires >= chrono::Utc::now().timestamp() && sign(&self.secret, key, expires) == sig
    }

    /// Delete an object. Deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match &self.backend {
            StorageBackend::Filesystem(fs) => fs.delete(key).await,
            StorageBackend::Memory(mem) => {
                mem.delete(key);
                Ok(())
            }
        }
    }

    /// Fetch object bytes (memory backend only, for tests and the
    /// local object route).
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        match &self.backend {
            StorageBackend::Filesystem(fs) => fs.get(key).await,
            StorageBackend::Memory(mem) => mem
                .get(key)
                .ok_or_else(|| StorageError::NotFound(key.to_string())),
        }
    }

    /// Number of successful writes (memory backend; 0 for filesystem).
    pub fn put_count(&self) -> usize {
        match &self.backend {
            StorageBackend::Filesystem(_) => 0,
            StorageBackend::Memory(mem) => mem.put_count(),
        }
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            StorageBackend::Filesystem(_) => "Filesystem",
            StorageBackend::Memory(_) => "Memory",
        };
        f.debug_struct("ObjectStore")
            .field("backend", &backend)
            .finish()
    }
}
