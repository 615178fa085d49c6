//! Top-level create and update-or-create for authors and regions.
//! Articles are upserted by the store in one call, see [`crate::store::ArticleRepository::save_article`].

use crate::error::AppError;
use crate::model::{Author, AuthorFields, Region, RegionFields};
use crate::store::{duplicate_author_name, duplicate_id, AuthorRepository, RegionRepository};

/// Create-only: an id that is already taken is rejected rather than overwritten.
pub async fn create_author<R>(repo: &R, id: Option<i32>, fields: &AuthorFields) -> Result<Author, AppError>
where
    R: AuthorRepository + ?Sized,
{
    if let Some(id) = id {
        if repo.get_author(id).await?.is_some() {
            return Err(duplicate_id("Author"));
        }
    }
    if repo
        .find_author_by_name(&fields.first_name, &fields.last_name)
        .await?
        .is_some()
    {
        return Err(duplicate_author_name());
    }
    let author = repo.insert_author(id, fields).await?;
    tracing::info!(author_id = author.id, "author created");
    Ok(author)
}

pub async fn update_or_create_author<R>(
    repo: &R,
    id: Option<i32>,
    fields: &AuthorFields,
) -> Result<Author, AppError>
where
    R: AuthorRepository + ?Sized,
{
    if let Some(holder) = repo
        .find_author_by_name(&fields.first_name, &fields.last_name)
        .await?
    {
        if Some(holder.id) != id {
            return Err(duplicate_author_name());
        }
    }
    if let Some(id) = id {
        if let Some(author) = repo.update_author(id, fields).await? {
            return Ok(author);
        }
    }
    repo.insert_author(id, fields).await
}

pub async fn update_or_create_region<R>(
    repo: &R,
    id: Option<i32>,
    fields: &RegionFields,
) -> Result<Region, AppError>
where
    R: RegionRepository + ?Sized,
{
    if let Some(id) = id {
        if let Some(region) = repo.update_region(id, fields).await? {
            return Ok(region);
        }
    }
    repo.insert_region(id, fields).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn names(first: &str, last: &str) -> AuthorFields {
        AuthorFields {
            first_name: first.into(),
            last_name: last.into(),
        }
    }

    #[tokio::test]
    async fn create_rejects_taken_id() {
        let store = MemoryStore::new();
        let existing = create_author(&store, None, &names("A", "B")).await.unwrap();
        let err = create_author(&store, Some(existing.id), &names("C", "D"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.get_author(existing.id).await.unwrap().unwrap(), existing);
    }

    #[tokio::test]
    async fn update_or_create_overwrites_by_id() {
        let store = MemoryStore::new();
        let existing = create_author(&store, None, &names("A", "B")).await.unwrap();
        let updated = update_or_create_author(&store, Some(existing.id), &names("C", "D"))
            .await
            .unwrap();
        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.first_name, "C");
    }

    #[tokio::test]
    async fn update_keeps_own_name_pair() {
        let store = MemoryStore::new();
        let existing = create_author(&store, None, &names("A", "B")).await.unwrap();
        assert!(update_or_create_author(&store, Some(existing.id), &names("A", "B"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn update_rejects_name_pair_of_other_author() {
        let store = MemoryStore::new();
        create_author(&store, None, &names("A", "B")).await.unwrap();
        let other = create_author(&store, None, &names("C", "D")).await.unwrap();
        assert!(update_or_create_author(&store, Some(other.id), &names("A", "B"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn region_update_or_create_inserts_missing_id() {
        let store = MemoryStore::new();
        let fields = RegionFields {
            code: "AL".into(),
            name: "Albania".into(),
        };
        let region = update_or_create_region(&store, Some(4), &fields).await.unwrap();
        assert_eq!(region.id, 4);
        assert_eq!(store.list_regions().await.unwrap(), vec![region]);
    }
}
