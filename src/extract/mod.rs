//! Field extraction from rendered article pages.
//!
//! Two page layouts exist. Older articles render server side and only need
//! a short settle; newer ones lazy-load their body while scrolling and hide
//! code blocks until revealed. Which one applies is decided by id alone.

mod filter;
mod legacy;
mod markup;
mod modern;

use crate::browser::RenderingAgent;
use crate::config::BrowserSettings;
use crate::error::Result;
use crate::models::{placeholder_title, UNKNOWN_AUTHOR};

pub use filter::is_empty_article;

const TITLE_SELECTOR: &str = ".detail_title";
const AUTHOR_SELECTOR: &str = ".username";
const CATEGORY_SELECTOR: &str = ".cates_span";
const LEGACY_BODY_SELECTOR: &str = ".detail_content, #markdown-body";
const MODERN_BODY_SELECTOR: &str = ".ne-viewer-body";
const EMPTY_BODY: &str = "<p>No content</p>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    Legacy,
    Modern,
}

impl SchemaVariant {
    /// `id == threshold` is still legacy.
    pub fn select(id: i64, threshold: i64) -> Self {
        if id <= threshold {
            SchemaVariant::Legacy
        } else {
            SchemaVariant::Modern
        }
    }
}

/// Fields as read off the page, with fallbacks already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFields {
    pub title: String,
    pub author: String,
    pub category: String,
    pub body_html: String,
}

/// Loads `url` in `agent` and reads the article fields using the layout
/// for `variant`. Missing elements never fail; only the browser does.
pub async fn extract_fields<A: RenderingAgent>(
    agent: &A,
    variant: SchemaVariant,
    id: i64,
    url: &str,
    settings: &BrowserSettings,
) -> Result<RawFields> {
    match variant {
        SchemaVariant::Legacy => legacy::extract(agent, id, url, settings).await,
        SchemaVariant::Modern => modern::extract(agent, id, url, settings).await,
    }
}

async fn text_of<A: RenderingAgent>(agent: &A, css: &str) -> Result<Option<String>> {
    match agent.query_selector(css).await? {
        Some(element) => Ok(Some(agent.inner_text(&element).await?.trim().to_string())),
        None => Ok(None),
    }
}

/// First selector in `chain` that matches wins.
async fn html_of_first<A: RenderingAgent>(agent: &A, chain: &[&str]) -> Result<Option<String>> {
    for css in chain {
        if let Some(element) = agent.query_selector(css).await? {
            return Ok(Some(agent.inner_html(&element).await?));
        }
    }
    Ok(None)
}

/// Title, author and category are laid out identically in both variants.
async fn header_fields<A: RenderingAgent>(agent: &A, id: i64) -> Result<(String, String, String)> {
    let title = text_of(agent, TITLE_SELECTOR)
        .await?
        .unwrap_or_else(|| placeholder_title(id));
    let author = text_of(agent, AUTHOR_SELECTOR)
        .await?
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let category = text_of(agent, CATEGORY_SELECTOR).await?.unwrap_or_default();
    Ok((title, author, category))
}
