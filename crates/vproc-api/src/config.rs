//! API configuration.

/// Blob store behind the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3-compatible object storage
    S3,
    /// Process-local map, for running without credentials
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "memory" => Self::Memory,
            _ => Self::S3,
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Blob store implementation
    pub storage_backend: StorageBackend,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_size: 1024 * 1024, // 1MB, notifications are tiny
            environment: "development".to_string(),
            metrics_enabled: true,
            storage_backend: StorageBackend::S3,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            storage_backend: std::env::var("STORAGE_BACKEND")
                .map(|v| StorageBackend::parse(&v))
                .unwrap_or(StorageBackend::S3),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
