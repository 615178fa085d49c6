//! In-process store with the same constraints as the PostgreSQL tables.

use super::{
    duplicate_author_name, duplicate_id, ArticleRepository, AuthorRepository, RegionRepository,
    Store,
};
use crate::error::{AppError, ValidationErrors};
use crate::model::{
    Article, ArticleChanges, ArticleRow, Author, AuthorFields, Region, RegionFields,
};
use crate::service::validation::MISSING;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// Id generator mirroring a SERIAL column: explicit ids push it forward, deleted ids are not reused.
#[derive(Default)]
struct Sequence(i32);

impl Sequence {
    fn next(&mut self, table: &'static str, explicit: Option<i32>) -> Result<i32, AppError> {
        match explicit {
            Some(id) => {
                self.0 = self.0.max(id);
                Ok(id)
            }
            None => {
                self.0 = self.0.checked_add(1).ok_or(AppError::SequenceExhausted(table))?;
                Ok(self.0)
            }
        }
    }
}

#[derive(Default)]
struct Tables {
    authors: BTreeMap<i32, Author>,
    author_seq: Sequence,
    regions: BTreeMap<i32, Region>,
    region_seq: Sequence,
    articles: BTreeMap<i32, ArticleRow>,
    article_seq: Sequence,
    article_regions: BTreeMap<i32, BTreeSet<i32>>,
}

impl Tables {
    fn name_taken(&self, fields: &AuthorFields, except: Option<i32>) -> bool {
        self.authors.values().any(|a| {
            Some(a.id) != except && a.first_name == fields.first_name && a.last_name == fields.last_name
        })
    }

    fn assemble(&self, row: &ArticleRow) -> Article {
        let author = row.author_id.and_then(|id| self.authors.get(&id).cloned());
        let regions = self
            .article_regions
            .get(&row.id)
            .map(|ids| ids.iter().filter_map(|id| self.regions.get(id).cloned()).collect())
            .unwrap_or_default();
        Article::new(row.clone(), author, regions)
    }

    fn check_references(&self, changes: &ArticleChanges) -> Result<(), AppError> {
        let mut errors = ValidationErrors::new();
        if let Some(Some(author_id)) = changes.author {
            if !self.authors.contains_key(&author_id) {
                errors.add("author", format!("Author {} does not exist.", author_id));
            }
        }
        for id in changes.regions.iter().flatten() {
            if !self.regions.contains_key(id) {
                errors.add("regions", format!("Region {} does not exist.", id));
            }
        }
        Ok(errors.into_result()?)
    }

    fn remove_article(&mut self, id: i32) -> bool {
        self.article_regions.remove(&id);
        self.articles.remove(&id).is_some()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorRepository for MemoryStore {
    async fn list_authors(&self) -> Result<Vec<Author>, AppError> {
        Ok(self.tables.read().await.authors.values().cloned().collect())
    }

    async fn get_author(&self, id: i32) -> Result<Option<Author>, AppError> {
        Ok(self.tables.read().await.authors.get(&id).cloned())
    }

    async fn find_author_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Author>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .authors
            .values()
            .find(|a| a.first_name == first_name && a.last_name == last_name)
            .cloned())
    }

    async fn insert_author(&self, id: Option<i32>, fields: &AuthorFields) -> Result<Author, AppError> {
        let mut tables = self.tables.write().await;
        if id.is_some_and(|id| tables.authors.contains_key(&id)) {
            return Err(duplicate_id("Author"));
        }
        if tables.name_taken(fields, None) {
            return Err(duplicate_author_name());
        }
        let author = Author {
            id: tables.author_seq.next("authors", id)?,
            first_name: fields.first_name.clone(),
            last_name: fields.last_name.clone(),
        };
        tables.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: i32, fields: &AuthorFields) -> Result<Option<Author>, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.authors.contains_key(&id) {
            return Ok(None);
        }
        if tables.name_taken(fields, Some(id)) {
            return Err(duplicate_author_name());
        }
        let author = Author {
            id,
            first_name: fields.first_name.clone(),
            last_name: fields.last_name.clone(),
        };
        tables.authors.insert(id, author.clone());
        Ok(Some(author))
    }

    async fn delete_author(&self, id: i32) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.authors.remove(&id).is_none() {
            return Ok(false);
        }
        let written: Vec<i32> = tables
            .articles
            .values()
            .filter(|a| a.author_id == Some(id))
            .map(|a| a.id)
            .collect();
        for article_id in written {
            tables.remove_article(article_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl RegionRepository for MemoryStore {
    async fn list_regions(&self) -> Result<Vec<Region>, AppError> {
        Ok(self.tables.read().await.regions.values().cloned().collect())
    }

    async fn get_region(&self, id: i32) -> Result<Option<Region>, AppError> {
        Ok(self.tables.read().await.regions.get(&id).cloned())
    }

    async fn insert_region(&self, id: Option<i32>, fields: &RegionFields) -> Result<Region, AppError> {
        let mut tables = self.tables.write().await;
        if id.is_some_and(|id| tables.regions.contains_key(&id)) {
            return Err(duplicate_id("Region"));
        }
        let region = Region {
            id: tables.region_seq.next("regions", id)?,
            code: fields.code.clone(),
            name: fields.name.clone(),
        };
        tables.regions.insert(region.id, region.clone());
        Ok(region)
    }

    async fn update_region(&self, id: i32, fields: &RegionFields) -> Result<Option<Region>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.regions.get_mut(&id).map(|region| {
            region.code = fields.code.clone();
            region.name = fields.name.clone();
            region.clone()
        }))
    }

    async fn delete_region(&self, id: i32) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.regions.remove(&id).is_none() {
            return Ok(false);
        }
        for ids in tables.article_regions.values_mut() {
            ids.remove(&id);
        }
        Ok(true)
    }
}

#[async_trait]
impl ArticleRepository for MemoryStore {
    async fn list_articles(&self) -> Result<Vec<Article>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.articles.values().map(|row| tables.assemble(row)).collect())
    }

    async fn get_article(&self, id: i32) -> Result<Option<Article>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.articles.get(&id).map(|row| tables.assemble(row)))
    }

    async fn save_article(&self, id: Option<i32>, changes: &ArticleChanges) -> Result<Article, AppError> {
        let mut tables = self.tables.write().await;
        tables.check_references(changes)?;

        let existing = id.and_then(|id| tables.articles.get(&id).cloned());
        let row = match existing {
            Some(mut row) => {
                changes.apply_to(&mut row);
                row
            }
            None => {
                // Validate before consuming a sequence value.
                let mut row = changes
                    .new_row(0)
                    .ok_or_else(|| ValidationErrors::single("title", MISSING))?;
                row.id = tables.article_seq.next("articles", id)?;
                row
            }
        };
        tables.articles.insert(row.id, row.clone());
        if let Some(region_ids) = changes.region_ids() {
            tables
                .article_regions
                .insert(row.id, region_ids.into_iter().collect());
        }
        Ok(tables.assemble(&row))
    }

    async fn delete_article(&self, id: i32) -> Result<bool, AppError> {
        Ok(self.tables.write().await.remove_article(id))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(first: &str, last: &str) -> AuthorFields {
        AuthorFields {
            first_name: first.into(),
            last_name: last.into(),
        }
    }

    fn region(code: &str, name: &str) -> RegionFields {
        RegionFields {
            code: code.into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn generated_ids_skip_explicit_ones() {
        let store = MemoryStore::new();
        let a = store.insert_author(Some(5), &names("A", "A")).await.unwrap();
        let b = store.insert_author(None, &names("B", "B")).await.unwrap();
        assert_eq!(a.id, 5);
        assert_eq!(b.id, 6);
    }

    #[tokio::test]
    async fn exhausted_sequence_is_an_error() {
        let store = MemoryStore::new();
        store.insert_region(Some(i32::MAX), &region("A", "B")).await.unwrap();
        let err = store.insert_region(None, &region("C", "D")).await.unwrap_err();
        assert!(matches!(err, AppError::SequenceExhausted("regions")));
        assert_eq!(store.list_regions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn author_name_pair_is_unique() {
        let store = MemoryStore::new();
        store.insert_author(None, &names("Ada", "Lovelace")).await.unwrap();
        let err = store
            .insert_author(None, &names("Ada", "Lovelace"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn deleting_author_cascades_to_articles() {
        let store = MemoryStore::new();
        let author = store.insert_author(None, &names("Ada", "Lovelace")).await.unwrap();
        let changes = ArticleChanges {
            title: Some("Notes".into()),
            author: Some(Some(author.id)),
            ..Default::default()
        };
        let article = store.save_article(None, &changes).await.unwrap();

        assert!(store.delete_author(author.id).await.unwrap());
        assert!(store.get_article(article.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_region_only_detaches_it() {
        let store = MemoryStore::new();
        let al = store.insert_region(None, &region("AL", "Albania")).await.unwrap();
        let uk = store.insert_region(None, &region("UK", "United Kingdom")).await.unwrap();
        let changes = ArticleChanges {
            title: Some("Travel".into()),
            regions: Some(vec![al.id, uk.id]),
            ..Default::default()
        };
        let article = store.save_article(None, &changes).await.unwrap();

        assert!(store.delete_region(al.id).await.unwrap());
        let article = store.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(article.regions, vec![uk]);
    }

    #[tokio::test]
    async fn save_without_regions_keeps_associations() {
        let store = MemoryStore::new();
        let al = store.insert_region(None, &region("AL", "Albania")).await.unwrap();
        let created = store
            .save_article(
                None,
                &ArticleChanges {
                    title: Some("Travel".into()),
                    regions: Some(vec![al.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let updated = store
            .save_article(
                Some(created.id),
                &ArticleChanges {
                    content: Some("More".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.regions, vec![al]);
        assert_eq!(updated.content, "More");
    }

    #[tokio::test]
    async fn save_rejects_unknown_author() {
        let store = MemoryStore::new();
        let changes = ArticleChanges {
            title: Some("Ghost".into()),
            author: Some(Some(42)),
            ..Default::default()
        };
        assert!(store.save_article(None, &changes).await.is_err());
        assert!(store.list_articles().await.unwrap().is_empty());
    }
}
