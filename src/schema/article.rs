//! Article load resolves the embedded author and regions before upserting the article.

use super::{author, nest_errors, region, LoadMode, ResourceSchema};
use crate::error::{AppError, ValidationErrors};
use crate::model::{Article, ArticleChanges, ARTICLE_TITLE_MAX};
use crate::service::validation::MISSING;
use crate::service::{resolve_author, resolve_regions, AuthorRef, FieldReader, RegionRef, StringRule};
use crate::store::Store;
use async_trait::async_trait;
use serde_json::Value;

const FIELDS: &[&str] = &["id", "title", "content", "author", "regions"];

pub struct ArticleSchema;

/// A validated article body, before any nested reference is resolved.
#[derive(Debug, Default, PartialEq)]
struct ArticleDraft {
    id: Option<i32>,
    title: Option<String>,
    content: Option<String>,
    author: Option<Option<AuthorRef>>,
    regions: Option<Vec<RegionRef>>,
}

impl ArticleDraft {
    fn parse(body: Value) -> Result<Self, ValidationErrors> {
        let mut reader = FieldReader::new(body, FIELDS)?;
        let id = reader.integer("id");
        let title = reader.string("title", StringRule::optional(Some(ARTICLE_TITLE_MAX)));
        let content = reader.string("content", StringRule::optional(None));

        let author = match reader.nullable("author") {
            None => None,
            Some(None) => Some(None),
            Some(Some(value)) => match author::parse_ref(value) {
                Ok(reference) => Some(Some(reference)),
                Err(errors) => {
                    reader.nest("author", errors);
                    None
                }
            },
        };

        let regions = reader.list("regions").map(|items| {
            let mut errors = ValidationErrors::new();
            let mut references = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match region::parse_ref(item) {
                    Ok(reference) => references.push(reference),
                    Err(e) => errors.nest(&index.to_string(), e),
                }
            }
            reader.nest("regions", errors);
            references
        });

        reader.finish()?;
        Ok(ArticleDraft {
            id,
            title,
            content,
            author,
            regions,
        })
    }
}

#[async_trait]
impl ResourceSchema for ArticleSchema {
    const ENTITY: &'static str = "Article";

    type Output = Article;

    async fn list(store: &dyn Store) -> Result<Vec<Article>, AppError> {
        store.list_articles().await
    }

    async fn fetch(store: &dyn Store, id: i32) -> Result<Option<Article>, AppError> {
        store.get_article(id).await
    }

    async fn load(store: &dyn Store, body: Value, _mode: LoadMode) -> Result<Article, AppError> {
        let draft = ArticleDraft::parse(body)?;

        // Only a new article needs a title.
        let exists = match draft.id {
            Some(id) => store.get_article(id).await?.is_some(),
            None => false,
        };
        if !exists && draft.title.is_none() {
            return Err(ValidationErrors::single("title", MISSING).into());
        }

        let author = match draft.author {
            None => None,
            Some(None) => Some(None),
            Some(Some(reference)) => {
                let author = resolve_author(store, reference)
                    .await
                    .map_err(|e| nest_errors("author", e))?;
                Some(Some(author.id))
            }
        };
        let regions = match draft.regions {
            None => None,
            Some(references) => {
                let regions = resolve_regions(store, references)
                    .await
                    .map_err(|e| nest_errors("regions", e))?;
                Some(regions.into_iter().map(|r| r.id).collect())
            }
        };

        let changes = ArticleChanges {
            title: draft.title,
            content: draft.content,
            author,
            regions,
        };
        let article = store.save_article(draft.id, &changes).await?;
        tracing::debug!(article_id = article.id, "article loaded");
        Ok(article)
    }

    async fn remove(store: &dyn Store, id: i32) -> Result<bool, AppError> {
        store.delete_article(id).await
    }
}
