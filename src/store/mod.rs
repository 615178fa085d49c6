//! Repository capabilities for each entity, joined into one [`Store`].
//!
//! Rows are read and written through these traits only; the schemas and the
//! nested-resolution functions never see `sqlx` directly. [`PgStore`] is the
//! production implementation, [`MemoryStore`] keeps everything in process.

mod bootstrap;
mod memory;
mod postgres;

pub use bootstrap::{ensure_database_exists, ensure_tables};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::{AppError, ValidationErrors, SCHEMA_KEY};
use crate::model::{Article, ArticleChanges, Author, AuthorFields, Region, RegionFields};
use async_trait::async_trait;

#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn list_authors(&self) -> Result<Vec<Author>, AppError>;

    async fn get_author(&self, id: i32) -> Result<Option<Author>, AppError>;

    async fn find_author_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Author>, AppError>;

    /// Insert with the given id, or a generated one when `id` is `None`.
    async fn insert_author(&self, id: Option<i32>, fields: &AuthorFields) -> Result<Author, AppError>;

    async fn update_author(&self, id: i32, fields: &AuthorFields) -> Result<Option<Author>, AppError>;

    /// Also deletes every article written by this author.
    async fn delete_author(&self, id: i32) -> Result<bool, AppError>;
}

#[async_trait]
pub trait RegionRepository: Send + Sync {
    async fn list_regions(&self) -> Result<Vec<Region>, AppError>;

    async fn get_region(&self, id: i32) -> Result<Option<Region>, AppError>;

    async fn insert_region(&self, id: Option<i32>, fields: &RegionFields) -> Result<Region, AppError>;

    async fn update_region(&self, id: i32, fields: &RegionFields) -> Result<Option<Region>, AppError>;

    /// Detaches the region from its articles; the articles stay.
    async fn delete_region(&self, id: i32) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn list_articles(&self) -> Result<Vec<Article>, AppError>;

    async fn get_article(&self, id: i32) -> Result<Option<Article>, AppError>;

    /// Update-or-create keyed by `id`, then replace the region set when
    /// `changes.regions` is present. Creating requires `changes.title`.
    async fn save_article(&self, id: Option<i32>, changes: &ArticleChanges) -> Result<Article, AppError>;

    /// Removes region associations; the regions themselves stay.
    async fn delete_article(&self, id: i32) -> Result<bool, AppError>;
}

/// Every repository capability plus a liveness check.
#[async_trait]
pub trait Store: AuthorRepository + RegionRepository + ArticleRepository {
    async fn ping(&self) -> Result<(), AppError>;
}

pub(crate) fn duplicate_author_name() -> AppError {
    ValidationErrors::single(
        SCHEMA_KEY,
        "Author with this first_name and last_name already exists.",
    )
    .into()
}

pub(crate) fn duplicate_id(entity: &str) -> AppError {
    ValidationErrors::single("id", format!("{} with this id already exists.", entity)).into()
}
