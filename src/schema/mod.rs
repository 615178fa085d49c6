//! Per-entity load (validate + persist) and dump rules.
//!
//! A [`ResourceSchema`] is everything the generic handlers need to serve one
//! entity type: how to list, fetch, load and remove it through a [`Store`].

pub mod article;
pub mod author;
pub mod region;

pub use article::ArticleSchema;
pub use author::AuthorSchema;
pub use region::RegionSchema;

use crate::error::AppError;
use crate::store::Store;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Which handler is loading the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// POST on the collection.
    Create,
    /// PUT on an item; the body already carries the item's id.
    Update,
}

#[async_trait]
pub trait ResourceSchema: Send + Sync + 'static {
    /// Entity name used in not-found messages.
    const ENTITY: &'static str;

    type Output: Serialize + Send;

    async fn list(store: &dyn Store) -> Result<Vec<Self::Output>, AppError>;

    async fn fetch(store: &dyn Store, id: i32) -> Result<Option<Self::Output>, AppError>;

    async fn load(store: &dyn Store, body: Value, mode: LoadMode) -> Result<Self::Output, AppError>;

    async fn remove(store: &dyn Store, id: i32) -> Result<bool, AppError>;
}

/// Re-key validation errors raised while resolving a nested field.
pub(crate) fn nest_errors(field: &str, err: AppError) -> AppError {
    match err {
        AppError::Validation(errors) => {
            let mut nested = crate::error::ValidationErrors::new();
            nested.nest(field, errors);
            nested.into()
        }
        other => other,
    }
}
