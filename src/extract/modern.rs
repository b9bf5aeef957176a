use std::time::Duration;

use crate::browser::{RenderingAgent, WaitCondition};
use crate::config::BrowserSettings;
use crate::error::Result;

use super::markup::strip_hidden_styles;
use super::{
    header_fields, html_of_first, RawFields, EMPTY_BODY, LEGACY_BODY_SELECTOR,
    MODERN_BODY_SELECTOR,
};

const SCROLL_HEIGHT_JS: &str = "document.body.scrollHeight";
const CODE_CARD_SELECTOR: &str = r#"ne-card[data-card-name="codeblock"]"#;

const REVEAL_JS: &str = r#"(() => {
    document.querySelectorAll('.ne-codeblock').forEach(el => {
        el.style.display = 'block';
    });
    document.querySelectorAll('[style*="display: none"]').forEach(el => {
        el.style.display = '';
    });
})()"#;

fn sleep_ms(ms: u64) -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(ms))
}

pub(super) async fn extract<A: RenderingAgent>(
    agent: &A,
    id: i64,
    url: &str,
    settings: &BrowserSettings,
) -> Result<RawFields> {
    tracing::info!("ID {}: modern layout, scrolling to load content...", id);
    agent
        .navigate(
            url,
            settings.modern_navigation_timeout(),
            WaitCondition::DomContentLoaded,
        )
        .await?;

    auto_scroll(agent, id, settings).await?;
    sleep_ms(settings.post_scroll_settle_ms).await;

    agent.evaluate(REVEAL_JS).await?;
    sleep_ms(settings.reveal_settle_ms).await;

    let code_cards = agent.query_selector_all(CODE_CARD_SELECTOR).await?;
    if !code_cards.is_empty() {
        tracing::info!("ID {}: found {} code blocks", id, code_cards.len());
    }
    sleep_ms(settings.code_card_settle_ms).await;

    let (title, author, category) = header_fields(agent, id).await?;
    let body_html = html_of_first(agent, &[MODERN_BODY_SELECTOR, LEGACY_BODY_SELECTOR])
        .await?
        .unwrap_or_else(|| EMPTY_BODY.to_string());

    Ok(RawFields {
        title,
        author,
        category,
        body_html: strip_hidden_styles(&body_html),
    })
}

/// Scrolls one step per tick until the distance covered reaches the page
/// height, re-reading the height every tick since lazy content grows it.
async fn auto_scroll<A: RenderingAgent>(agent: &A, id: i64, settings: &BrowserSettings) -> Result<()> {
    let step = i64::from(settings.scroll_step_px);
    let scroll_js = format!("window.scrollBy(0, {})", step);
    let mut total = 0i64;
    let mut ticks = 0u32;

    loop {
        let height = agent.evaluate(SCROLL_HEIGHT_JS).await?.as_i64().unwrap_or(0);
        agent.evaluate(&scroll_js).await?;
        total += step;
        ticks += 1;

        if total >= height {
            return Ok(());
        }
        if ticks >= settings.max_scroll_ticks {
            tracing::warn!(
                "ID {}: stopped scrolling after {} ticks ({}px of {}px)",
                id,
                ticks,
                total,
                height
            );
            return Ok(());
        }
        sleep_ms(settings.scroll_interval_ms).await;
    }
}
