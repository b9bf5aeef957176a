use chrono::Utc;

use crate::browser::{BrowserLauncher, RenderingAgent};
use crate::error::Result;
use crate::extract::{extract_fields, is_empty_article, RawFields, SchemaVariant};
use crate::models::{ArticleRecord, ScrapeOutcome};

use super::Harvester;

impl<L: BrowserLauncher> Harvester<L> {
    /// Runs the whole pipeline for one id. Every failure is folded into
    /// `ScrapeOutcome::Error`.
    pub async fn process(&self, id: i64) -> ScrapeOutcome {
        match self.try_process(id).await {
            Ok(outcome) => outcome,
            Err(e) => ScrapeOutcome::Error(e.to_string()),
        }
    }

    async fn try_process(&self, id: i64) -> Result<ScrapeOutcome> {
        if self.repository.article_exists(id).await? {
            tracing::info!("ID {}: already in database, skipping", id);
            return Ok(ScrapeOutcome::Exists);
        }

        let url = self.config.article_url(id);
        let variant = SchemaVariant::select(id, self.config.schema_threshold);
        let fields = self.render(id, &url, variant).await?;

        if is_empty_article(&fields.title, id) {
            return Ok(ScrapeOutcome::Skip("blank title".to_string()));
        }

        let content_html = self.images.localize_images(&fields.body_html).await;
        let record = ArticleRecord {
            id,
            title: fields.title,
            author: fields.author,
            url,
            category: Some(fields.category).filter(|c| !c.is_empty()),
            content_html,
            created_at: Utc::now(),
        };

        if !self.repository.save_article(&record).await {
            return Ok(ScrapeOutcome::Error(format!("failed to save article {}", id)));
        }
        Ok(ScrapeOutcome::Success(record))
    }

    /// One browser session per article, closed whether or not extraction
    /// succeeded.
    async fn render(&self, id: i64, url: &str, variant: SchemaVariant) -> Result<RawFields> {
        let agent = self.launcher.launch().await?;
        let fields = extract_fields(&agent, variant, id, url, &self.config.browser).await;
        if let Err(e) = agent.close().await {
            tracing::debug!("ID {}: closing browser failed: {}", id, e);
        }
        fields
    }
}
