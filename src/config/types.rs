use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/newsroom";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "newsroom_api=info,tower_http=info";

/// Where rows are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process memory; lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::Invalid {
                key: "STORAGE",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub max_body_bytes: usize,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: DEFAULT_DATABASE_URL.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            storage: StorageBackend::Postgres,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}
