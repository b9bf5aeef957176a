use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::ImageSettings;
use crate::error::{AppError, Result};

use super::http::HttpFetch;

const DEFAULT_EXTENSION: &str = ".png";

static NEXT_PART: AtomicU64 = AtomicU64::new(0);

static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<img[^>]+>").unwrap());
static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src=["']([^"']+)["']"#).unwrap());

/// Content address of an image: the SHA-256 of its source URL text.
pub fn content_address(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Extension of the last path segment, query string excluded.
fn url_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split('?').next().unwrap_or(url).to_string(),
    };
    let file_name = path.rsplit('/').next()?;
    let stem_len = file_name.trim_start_matches('.').len();
    let dot = file_name.rfind('.')?;
    // a name that is only leading dots has no extension
    if dot < file_name.len() - stem_len {
        return None;
    }
    Some(file_name[dot..].to_string())
}

pub fn cache_file_name(url: &str) -> String {
    let ext = url_extension(url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{}{}", content_address(url), ext)
}

/// Permanent URL-keyed image cache on disk. Entries are never evicted.
pub struct ImageCache {
    dir: PathBuf,
    url_prefix: String,
    settings: ImageSettings,
    fetcher: Arc<dyn HttpFetch>,
}

impl ImageCache {
    pub fn new(
        dir: impl Into<PathBuf>,
        url_prefix: &str,
        settings: ImageSettings,
        fetcher: Arc<dyn HttpFetch>,
    ) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            settings,
            fetcher,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn public_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name)
    }

    /// Returns the public path of the cached copy of `url`, downloading it
    /// on a cache miss.
    pub async fn localize(&self, url: &str) -> Result<String> {
        let file_name = cache_file_name(url);
        let local_path = self.dir.join(&file_name);

        if tokio::fs::try_exists(&local_path).await? {
            return Ok(self.public_path(&file_name));
        }

        let headers = [
            ("User-Agent", self.settings.user_agent.as_str()),
            ("Referer", self.settings.referer.as_str()),
        ];
        let response = self
            .fetcher
            .get(url, Duration::from_secs(self.settings.timeout_secs), &headers)
            .await?;

        if !response.is_success() {
            return Err(AppError::Other(anyhow::anyhow!(
                "HTTP {}",
                response.status
            )));
        }

        self.store(&local_path, &response.body).await?;
        Ok(self.public_path(&file_name))
    }

    /// Writes to a private `.part` file first so that an interrupted write
    /// never leaves a truncated file under the cache name.
    async fn store(&self, local_path: &Path, bytes: &[u8]) -> Result<()> {
        let part = local_path.with_extension(format!(
            "{}.part",
            NEXT_PART.fetch_add(1, Ordering::Relaxed)
        ));
        let written = match tokio::fs::write(&part, bytes).await {
            Ok(()) => tokio::fs::rename(&part, local_path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Rewrites absolute `<img src>` references to cached local copies.
    /// Tags whose image cannot be fetched keep their remote URL.
    pub async fn localize_images(&self, html: &str) -> String {
        // spans are collected up front so no regex iterator lives across an await
        let spans: Vec<(usize, usize)> = IMG_TAG
            .find_iter(html)
            .map(|m| (m.start(), m.end()))
            .collect();

        let mut out = String::with_capacity(html.len());
        let mut last = 0;

        for (start, end) in spans {
            out.push_str(&html[last..start]);
            out.push_str(&self.rewrite_tag(&html[start..end]).await);
            last = end;
        }
        out.push_str(&html[last..]);
        out
    }

    async fn rewrite_tag(&self, tag: &str) -> String {
        let Some(src) = IMG_SRC.captures(tag).and_then(|c| c.get(1)) else {
            return tag.to_string();
        };
        let src = src.as_str();
        if !src.starts_with("http") {
            return tag.to_string();
        }

        match self.localize(src).await {
            Ok(local) => tag.replace(src, &local),
            Err(e) => {
                let short: String = src.chars().take(50).collect();
                tracing::debug!("Image download failed: {}... - {}", short, e);
                tag.to_string()
            }
        }
    }
}
