use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::news::Category;

/// A generated article ready to be stored for a publication date.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedArticle {
    pub published_date: NaiveDate,
    pub language: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: Category,
    pub source_url: String,
}

/// Store of published articles, as seen by the pipeline.
#[async_trait::async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Whether an article already exists for (date, language, category).
    async fn exists_for(&self, date: NaiveDate, language: &str, category: Category) -> Result<bool>;

    /// Source identifiers of articles published on or after `since`.
    async fn used_identifiers_since(&self, since: NaiveDate) -> Result<HashSet<String>>;

    /// Insert a finalized article, returning its id.
    async fn insert(&self, article: &PublishedArticle) -> Result<i64>;
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Create the `articles` table if it does not exist yet.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    info!("storage: ensuring DB schema (CREATE TABLE IF NOT EXISTS ...)");
    let stmts = [
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            published_date TEXT NOT NULL,
            language TEXT NOT NULL,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            source_url TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );
        "#,
        "CREATE INDEX IF NOT EXISTS idx_articles_slot ON articles (published_date, language, category);",
        "CREATE INDEX IF NOT EXISTS idx_articles_source_url ON articles (source_url);",
    ];
    for stmt in stmts {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .context("failed to ensure articles schema")?;
    }
    Ok(())
}

/// SQLite-backed store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PersistenceStore for SqliteStore {
    async fn exists_for(&self, date: NaiveDate, language: &str, category: Category) -> Result<bool> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM articles WHERE published_date = ? AND language = ? AND category = ? LIMIT 1",
        )
        .bind(date_key(date))
        .bind(language)
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("failed to check existing article")?;
        Ok(existing.is_some())
    }

    async fn used_identifiers_since(&self, since: NaiveDate) -> Result<HashSet<String>> {
        let urls = sqlx::query_scalar::<_, String>(
            "SELECT source_url FROM articles WHERE published_date >= ?",
        )
        .bind(date_key(since))
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch recently used source urls")?;
        debug!(since = %since, count = urls.len(), "used identifiers loaded");
        Ok(urls.into_iter().collect())
    }

    async fn insert(&self, article: &PublishedArticle) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO articles (published_date, language, title, summary, content, category, source_url)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(date_key(article.published_date))
        .bind(&article.language)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(article.category.as_str())
        .bind(&article.source_url)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert article")?;

        info!("Stored article {} for {} ({})", id, article.category, article.published_date);
        Ok(id)
    }
}
