//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use moments_core::DEFAULT_COMPRESS_QUALITY;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Root directory for the filesystem object-store backend
    pub storage_root: PathBuf,
    /// Public base URL under which stored objects are served
    pub public_base_url: String,
    /// Secret used to sign time-bounded retrieval URLs
    pub url_signing_secret: String,
    /// Default TTL for presigned retrieval URLs in seconds (default: 3600)
    pub presign_ttl_secs: u64,
    /// JPEG quality for the compressed representation (default: 75)
    pub compress_quality: u8,
    /// Scratch directory for transient compressed files
    pub work_dir: PathBuf,
    /// Timeout for the detached compression path in seconds (default: 120)
    pub detached_timeout_secs: u64,
    /// Base URL of a remote metadata service; unset means in-process store
    pub metadata_base_url: Option<String>,
    /// Base URL of the recognition service; unset disables notification
    pub recognition_base_url: Option<String>,
    /// Timeout for outbound RPC calls in seconds (default: 10)
    pub rpc_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            database_max_connections: 20,
            storage_root: PathBuf::from("./storage"),
            public_base_url: "http://127.0.0.1:3000/objects".to_string(),
            url_signing_secret: "dev-secret".to_string(),
            presign_ttl_secs: 3600,
            compress_quality: DEFAULT_COMPRESS_QUALITY,
            work_dir: std::env::temp_dir().join("moments-work"),
            detached_timeout_secs: 120,
            metadata_base_url: None,
            recognition_base_url: None,
            rpc_timeout_secs: 10,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or([127, 0, 0, 1]);

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            port: env_parse("PORT", defaults.port),
            host,
            body_limit_mb: env_parse("BODY_LIMIT_MB", defaults.body_limit_mb),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB", defaults.max_file_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            storage_root: std::env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or(defaults.public_base_url)
                .trim_end_matches('/')
                .to_string(),
            url_signing_secret: std::env::var("URL_SIGNING_SECRET")
                .unwrap_or(defaults.url_signing_secret),
            presign_ttl_secs: env_parse("PRESIGN_TTL_SECS", defaults.presign_ttl_secs),
            compress_quality: env_parse("COMPRESS_QUALITY", defaults.compress_quality),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            detached_timeout_secs: env_parse(
                "DETACHED_TIMEOUT_SECS",
                defaults.detached_timeout_secs,
            ),
            metadata_base_url: std::env::var("METADATA_BASE_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            recognition_base_url: std::env::var("RECOGNITION_BASE_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            rpc_timeout_secs: env_parse("RPC_TIMEOUT_SECS", defaults.rpc_timeout_secs),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Timeout budget for the detached compression path
    pub fn detached_timeout(&self) -> Duration {
        Duration::from_secs(self.detached_timeout_secs)
    }

    /// Timeout applied to every outbound RPC
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}
