//! Nested resolution: turn an embedded author or region reference into a stored row.
//!
//! These are get-or-create operations over the repository traits and can be
//! driven directly, without going through HTTP. Supplied fields are only used
//! when a row has to be created; an existing row is returned untouched.

use crate::error::{AppError, ValidationErrors};
use crate::model::{Author, AuthorFields, Region, RegionFields};
use crate::store::{AuthorRepository, RegionRepository};

/// An author embedded in an article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorRef {
    pub id: Option<i32>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A region embedded in an article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionRef {
    pub id: Option<i32>,
    pub code: Option<String>,
    pub name: Option<String>,
}

/// With an id: fetch it, or create it with that id and the supplied names (empty when absent).
/// Without an id: reuse the author holding that name pair, or create one.
pub async fn resolve_author<R>(repo: &R, reference: AuthorRef) -> Result<Author, AppError>
where
    R: AuthorRepository + ?Sized,
{
    let fields = AuthorFields {
        first_name: reference.first_name.unwrap_or_default(),
        last_name: reference.last_name.unwrap_or_default(),
    };
    match reference.id {
        Some(id) => match repo.get_author(id).await? {
            Some(author) => Ok(author),
            None => {
                tracing::debug!(author_id = id, "creating referenced author");
                repo.insert_author(Some(id), &fields).await
            }
        },
        None => match repo
            .find_author_by_name(&fields.first_name, &fields.last_name)
            .await?
        {
            Some(author) => Ok(author),
            None => repo.insert_author(None, &fields).await,
        },
    }
}

/// With an id: fetch it, or create it with that id. Without an id: always create.
pub async fn resolve_region<R>(repo: &R, reference: RegionRef) -> Result<Region, AppError>
where
    R: RegionRepository + ?Sized,
{
    let fields = RegionFields {
        code: reference.code.unwrap_or_default(),
        name: reference.name.unwrap_or_default(),
    };
    match reference.id {
        Some(id) => match repo.get_region(id).await? {
            Some(region) => Ok(region),
            None => {
                tracing::debug!(region_id = id, "creating referenced region");
                repo.insert_region(Some(id), &fields).await
            }
        },
        None => repo.insert_region(None, &fields).await,
    }
}

/// Resolve each reference in order; a repeated id resolves to a single entry.
/// Validation errors are keyed by the index of the failing reference.
pub async fn resolve_regions<R>(repo: &R, references: Vec<RegionRef>) -> Result<Vec<Region>, AppError>
where
    R: RegionRepository + ?Sized,
{
    let mut regions: Vec<Region> = Vec::with_capacity(references.len());
    for (index, reference) in references.into_iter().enumerate() {
        let region = match resolve_region(repo, reference).await {
            Ok(region) => region,
            Err(AppError::Validation(errors)) => {
                let mut by_index = ValidationErrors::new();
                by_index.nest(&index.to_string(), errors);
                return Err(by_index.into());
            }
            Err(err) => return Err(err),
        };
        if !regions.iter().any(|r| r.id == region.id) {
            regions.push(region);
        }
    }
    Ok(regions)
}
