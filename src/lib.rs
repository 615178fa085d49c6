//! Newsroom API: REST backend for articles, their authors and regions.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;
pub mod store;

pub use config::{Settings, StorageBackend};
pub use error::{AppError, ConfigError, ValidationErrors};
pub use routes::{api_routes, app, common_routes};
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables, MemoryStore, PgStore, Store};
