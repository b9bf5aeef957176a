use std::time::Duration;

use crate::browser::{RenderingAgent, WaitCondition};
use crate::config::BrowserSettings;
use crate::error::Result;

use super::{header_fields, html_of_first, RawFields, EMPTY_BODY, LEGACY_BODY_SELECTOR};

pub(super) async fn extract<A: RenderingAgent>(
    agent: &A,
    id: i64,
    url: &str,
    settings: &BrowserSettings,
) -> Result<RawFields> {
    agent
        .navigate(
            url,
            settings.legacy_navigation_timeout(),
            WaitCondition::DomContentLoaded,
        )
        .await?;
    tokio::time::sleep(Duration::from_millis(settings.legacy_settle_ms)).await;

    let (title, author, category) = header_fields(agent, id).await?;
    let body_html = html_of_first(agent, &[LEGACY_BODY_SELECTOR])
        .await?
        .unwrap_or_else(|| EMPTY_BODY.to_string());

    Ok(RawFields {
        title,
        author,
        category,
        body_html,
    })
}
