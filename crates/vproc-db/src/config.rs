//! Database configuration.

/// Job store configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// sqlx connection URL
    pub database_url: String,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://videos.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DbConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://videos.db?mode=rwc".to_string()),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}
