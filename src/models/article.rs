use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author stored when the page carries no author element.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Title synthesized when the page carries no title element.
pub fn placeholder_title(id: i64) -> String {
    format!("Article {}", id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub url: String,
    pub category: Option<String>,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}
