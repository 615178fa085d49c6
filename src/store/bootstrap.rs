//! Database creation and table DDL run at startup. Every statement is idempotent.

use crate::error::{AppError, ConfigError};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Tables in dependency order.
const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS authors (
        id SERIAL PRIMARY KEY,
        first_name VARCHAR(40) NOT NULL,
        last_name VARCHAR(40) NOT NULL,
        CONSTRAINT authors_name_key UNIQUE (first_name, last_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS regions (
        id SERIAL PRIMARY KEY,
        code VARCHAR(10) NOT NULL,
        name VARCHAR(100) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id SERIAL PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        author_id INTEGER NULL REFERENCES authors (id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_regions (
        article_id INTEGER NOT NULL REFERENCES articles (id) ON DELETE CASCADE,
        region_id INTEGER NOT NULL REFERENCES regions (id) ON DELETE CASCADE,
        PRIMARY KEY (article_id, region_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS articles_author_id_idx ON articles (author_id)",
    "CREATE INDEX IF NOT EXISTS article_regions_region_id_idx ON article_regions (region_id)",
];

pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    for ddl in TABLES {
        tracing::debug!(sql = %ddl.trim(), "bootstrap");
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// Connect to the server's `postgres` database and create the target database if it is missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|_| ConfigError::Invalid {
        key: "DATABASE_URL",
        value: database_url.to_string(),
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let path_start = url.rfind('/').ok_or_else(|| ConfigError::Invalid {
        key: "DATABASE_URL",
        value: url.to_string(),
    })? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name_from_url() {
        let (admin, name) = parse_db_name_from_url("postgres://user:pw@localhost:5432/newsroom?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://user:pw@localhost:5432/postgres");
        assert_eq!(name, "newsroom");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("news\"room"), "\"news\"\"room\"");
    }
}
