use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::ArticleRecord;

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Duplicate guard: whether a record with this id is already stored.
    pub async fn article_exists(&self, id: i64) -> Result<bool> {
        let exists = self
            .conn
            .call(move |conn| {
                let found = conn
                    .query_row(
                        "SELECT 1 FROM articles WHERE id = ?1 LIMIT 1",
                        params![id],
                        |_| Ok(()),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
            .await?;
        Ok(exists)
    }

    /// Replaces any stored row with the same id. SQLite's `OR REPLACE`
    /// deletes the old row first, so no column survives from it.
    pub async fn upsert_article(&self, article: &ArticleRecord) -> Result<()> {
        let article = article.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT OR REPLACE INTO articles (id, title, author, url, category, content_html, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        article.id,
                        article.title,
                        article.author,
                        article.url,
                        article.category,
                        article.content_html,
                        article.created_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Record writer: like `upsert_article`, but logs and reports failure
    /// instead of propagating it.
    pub async fn save_article(&self, article: &ArticleRecord) -> bool {
        match self.upsert_article(article).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(id = article.id, "Failed to save article: {}", e);
                false
            }
        }
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<ArticleRecord>> {
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, author, url, category, content_html, created_at FROM articles WHERE id = ?1",
                )?;
                let article = stmt.query_row(params![id], article_from_row).optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Makes every later insert fail, to drive the write-failure path.
    #[cfg(test)]
    pub async fn reject_writes(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_writes BEFORE INSERT ON articles
                     BEGIN SELECT RAISE(ABORT, 'writes rejected'); END;",
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn count_articles(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn article_from_row(row: &Row) -> rusqlite::Result<ArticleRecord> {
    Ok(ArticleRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_default(),
        url: row.get(3)?,
        category: row.get(4)?,
        content_html: row
            .get::<_, Option<String>>(5)?
            .unwrap_or_default(),
        created_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}
