use crate::models::placeholder_title;

/// An extraction whose title is blank, or is the placeholder synthesized
/// when the page had no title element, is not an article.
pub fn is_empty_article(title: &str, id: i64) -> bool {
    title.trim().is_empty() || title == placeholder_title(id)
}
