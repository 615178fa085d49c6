//! Entity rows and write payloads shared by the schemas and the stores.

use serde::{Serialize, Serializer};

pub const AUTHOR_NAME_MAX: usize = 40;
pub const REGION_CODE_MAX: usize = 10;
pub const REGION_NAME_MAX: usize = 100;
pub const ARTICLE_TITLE_MAX: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Region {
    pub id: i32,
    pub code: String,
    pub name: String,
}

/// An `articles` row as stored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_id: Option<i32>,
}

/// What the client receives when they request an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub id: i32,
    pub title: String,
    pub content: String,
    #[serde(serialize_with = "author_or_empty")]
    pub author: Option<Author>,
    pub regions: Vec<Region>,
}

impl Article {
    /// `regions` are sorted by id.
    pub fn new(row: ArticleRow, author: Option<Author>, mut regions: Vec<Region>) -> Self {
        regions.sort_by_key(|r| r.id);
        Article {
            id: row.id,
            title: row.title,
            content: row.content,
            author,
            regions,
        }
    }
}

fn author_or_empty<S>(author: &Option<Author>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::SerializeMap;
    match author {
        Some(author) => author.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFields {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionFields {
    pub code: String,
    pub name: String,
}

/// Changes applied by an article upsert. `None` leaves the stored value untouched;
/// `author: Some(None)` detaches the author and `regions: Some(ids)` replaces the region set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<Option<i32>>,
    pub regions: Option<Vec<i32>>,
}

impl ArticleChanges {
    pub fn apply_to(&self, row: &mut ArticleRow) {
        if let Some(title) = &self.title {
            row.title = title.clone();
        }
        if let Some(content) = &self.content {
            row.content = content.clone();
        }
        if let Some(author_id) = self.author {
            row.author_id = author_id;
        }
    }

    /// Row for a new article, or `None` when no title was supplied.
    pub fn new_row(&self, id: i32) -> Option<ArticleRow> {
        Some(ArticleRow {
            id,
            title: self.title.clone()?,
            content: self.content.clone().unwrap_or_default(),
            author_id: self.author.flatten(),
        })
    }

    /// Region ids with duplicates removed, first occurrence wins.
    pub fn region_ids(&self) -> Option<Vec<i32>> {
        self.regions.as_ref().map(|ids| {
            let mut seen = std::collections::HashSet::new();
            ids.iter().copied().filter(|id| seen.insert(*id)).collect()
        })
    }
}
