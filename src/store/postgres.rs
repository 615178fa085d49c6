//! Repositories over PostgreSQL. Tables are created by [`super::ensure_tables`].

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
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

/// Constraint names from the bootstrap DDL.
const AUTHORS_NAME_KEY: &str = "authors_name_key";
const AUTHORS_PKEY: &str = "authors_pkey";
const REGIONS_PKEY: &str = "regions_pkey";

const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.title, a.content, a.author_id,
           au.first_name AS author_first_name, au.last_name AS author_last_name
    FROM articles a
    LEFT JOIN authors au ON au.id = a.author_id
"#;

#[derive(sqlx::FromRow)]
struct ArticleJoinRow {
    id: i32,
    title: String,
    content: String,
    author_id: Option<i32>,
    author_first_name: Option<String>,
    author_last_name: Option<String>,
}

impl ArticleJoinRow {
    fn split(self) -> (ArticleRow, Option<Author>) {
        let author = match (self.author_id, self.author_first_name, self.author_last_name) {
            (Some(id), Some(first_name), Some(last_name)) => Some(Author {
                id,
                first_name,
                last_name,
            }),
            _ => None,
        };
        let row = ArticleRow {
            id: self.id,
            title: self.title,
            content: self.content,
            author_id: self.author_id,
        };
        (row, author)
    }
}

#[derive(sqlx::FromRow)]
struct ArticleRegionRow {
    article_id: i32,
    id: i32,
    code: String,
    name: String,
}

/// Map constraint violations to the same validation errors the schemas report.
fn map_constraint(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        match db.constraint() {
            Some(AUTHORS_NAME_KEY) => return duplicate_author_name(),
            Some(AUTHORS_PKEY) => return duplicate_id("Author"),
            Some(REGIONS_PKEY) => return duplicate_id("Region"),
            _ => {}
        }
    }
    AppError::Db(err)
}

/// Move the table's id sequence past rows inserted with explicit ids.
async fn sync_sequence(conn: &mut PgConnection, table: &str) -> Result<(), AppError> {
    let sql = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), (SELECT GREATEST(COALESCE(MAX(id), 1), 1) FROM {table}))"
    );
    tracing::debug!(sql = %sql, "query");
    sqlx::query(&sql).execute(conn).await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn regions_for(&self, article_ids: &[i32]) -> Result<HashMap<i32, Vec<Region>>, AppError> {
        if article_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<ArticleRegionRow> = sqlx::query_as(
            r#"
            SELECT ar.article_id, r.id, r.code, r.name
            FROM article_regions ar
            JOIN regions r ON r.id = ar.region_id
            WHERE ar.article_id = ANY($1)
            ORDER BY r.id
            "#,
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_article: HashMap<i32, Vec<Region>> = HashMap::new();
        for row in rows {
            by_article.entry(row.article_id).or_default().push(Region {
                id: row.id,
                code: row.code,
                name: row.name,
            });
        }
        Ok(by_article)
    }

    async fn assemble(&self, rows: Vec<ArticleJoinRow>) -> Result<Vec<Article>, AppError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut regions = self.regions_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let regions = regions.remove(&r.id).unwrap_or_default();
                let (row, author) = r.split();
                Article::new(row, author, regions)
            })
            .collect())
    }
}

#[async_trait]
impl AuthorRepository for PgStore {
    async fn list_authors(&self) -> Result<Vec<Author>, AppError> {
        Ok(
            sqlx::query_as("SELECT id, first_name, last_name FROM authors ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_author(&self, id: i32) -> Result<Option<Author>, AppError> {
        Ok(
            sqlx::query_as("SELECT id, first_name, last_name FROM authors WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_author_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Author>, AppError> {
        Ok(sqlx::query_as(
            "SELECT id, first_name, last_name FROM authors WHERE first_name = $1 AND last_name = $2",
        )
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_author(&self, id: Option<i32>, fields: &AuthorFields) -> Result<Author, AppError> {
        let mut tx = self.pool.begin().await?;
        let author: Author = match id {
            Some(id) => sqlx::query_as(
                "INSERT INTO authors (id, first_name, last_name) VALUES ($1, $2, $3) RETURNING id, first_name, last_name",
            )
            .bind(id)
            .bind(&fields.first_name)
            .bind(&fields.last_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_constraint)?,
            None => sqlx::query_as(
                "INSERT INTO authors (first_name, last_name) VALUES ($1, $2) RETURNING id, first_name, last_name",
            )
            .bind(&fields.first_name)
            .bind(&fields.last_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_constraint)?,
        };
        if id.is_some() {
            sync_sequence(&mut *tx, "authors").await?;
        }
        tx.commit().await?;
        Ok(author)
    }

    async fn update_author(&self, id: i32, fields: &AuthorFields) -> Result<Option<Author>, AppError> {
        sqlx::query_as(
            "UPDATE authors SET first_name = $2, last_name = $3 WHERE id = $1 RETURNING id, first_name, last_name",
        )
        .bind(id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_constraint)
    }

    async fn delete_author(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RegionRepository for PgStore {
    async fn list_regions(&self) -> Result<Vec<Region>, AppError> {
        Ok(sqlx::query_as("SELECT id, code, name FROM regions ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_region(&self, id: i32) -> Result<Option<Region>, AppError> {
        Ok(sqlx::query_as("SELECT id, code, name FROM regions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_region(&self, id: Option<i32>, fields: &RegionFields) -> Result<Region, AppError> {
        let mut tx = self.pool.begin().await?;
        let region: Region = match id {
            Some(id) => sqlx::query_as(
                "INSERT INTO regions (id, code, name) VALUES ($1, $2, $3) RETURNING id, code, name",
            )
            .bind(id)
            .bind(&fields.code)
            .bind(&fields.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_constraint)?,
            None => sqlx::query_as("INSERT INTO regions (code, name) VALUES ($1, $2) RETURNING id, code, name")
                .bind(&fields.code)
                .bind(&fields.name)
                .fetch_one(&mut *tx)
                .await?,
        };
        if id.is_some() {
            sync_sequence(&mut *tx, "regions").await?;
        }
        tx.commit().await?;
        Ok(region)
    }

    async fn update_region(&self, id: i32, fields: &RegionFields) -> Result<Option<Region>, AppError> {
        Ok(
            sqlx::query_as("UPDATE regions SET code = $2, name = $3 WHERE id = $1 RETURNING id, code, name")
                .bind(id)
                .bind(&fields.code)
                .bind(&fields.name)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn delete_region(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM regions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ArticleRepository for PgStore {
    async fn list_articles(&self) -> Result<Vec<Article>, AppError> {
        let sql = format!("{} ORDER BY a.id", ARTICLE_SELECT);
        tracing::debug!(sql = %sql, "query");
        let rows: Vec<ArticleJoinRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        self.assemble(rows).await
    }

    async fn get_article(&self, id: i32) -> Result<Option<Article>, AppError> {
        let sql = format!("{} WHERE a.id = $1", ARTICLE_SELECT);
        let row: Option<ArticleJoinRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(self.assemble(row.into_iter().collect()).await?.pop())
    }

    async fn save_article(&self, id: Option<i32>, changes: &ArticleChanges) -> Result<Article, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<ArticleRow> = match id {
            Some(id) => {
                sqlx::query_as("SELECT id, title, content, author_id FROM articles WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            None => None,
        };

        let saved_id = match existing {
            Some(mut row) => {
                changes.apply_to(&mut row);
                sqlx::query("UPDATE articles SET title = $2, content = $3, author_id = $4 WHERE id = $1")
                    .bind(row.id)
                    .bind(&row.title)
                    .bind(&row.content)
                    .bind(row.author_id)
                    .execute(&mut *tx)
                    .await?;
                row.id
            }
            None => {
                let row = changes
                    .new_row(id.unwrap_or_default())
                    .ok_or_else(|| ValidationErrors::single("title", MISSING))?;
                let (inserted,): (i32,) = match id {
                    Some(_) => {
                        sqlx::query_as(
                            "INSERT INTO articles (id, title, content, author_id) VALUES ($1, $2, $3, $4) RETURNING id",
                        )
                        .bind(row.id)
                        .bind(&row.title)
                        .bind(&row.content)
                        .bind(row.author_id)
                        .fetch_one(&mut *tx)
                        .await?
                    }
                    None => {
                        sqlx::query_as(
                            "INSERT INTO articles (title, content, author_id) VALUES ($1, $2, $3) RETURNING id",
                        )
                        .bind(&row.title)
                        .bind(&row.content)
                        .bind(row.author_id)
                        .fetch_one(&mut *tx)
                        .await?
                    }
                };
                if id.is_some() {
                    sync_sequence(&mut *tx, "articles").await?;
                }
                inserted
            }
        };

        if let Some(region_ids) = changes.region_ids() {
            sqlx::query("DELETE FROM article_regions WHERE article_id = $1")
                .bind(saved_id)
                .execute(&mut *tx)
                .await?;
            if !region_ids.is_empty() {
                sqlx::query(
                    "INSERT INTO article_regions (article_id, region_id) SELECT $1, UNNEST($2::int4[])",
                )
                .bind(saved_id)
                .bind(&region_ids)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        tracing::debug!(article_id = saved_id, "article saved");

        self.get_article(saved_id)
            .await?
            .ok_or(AppError::NotFound("Article"))
    }

    async fn delete_article(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}
