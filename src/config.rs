use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};

const APP_DIR: &str = "article-harvester";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    /// Prefix under which the static asset root serves `image_dir`.
    #[serde(default = "default_image_url_prefix")]
    pub image_url_prefix: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Article URL is this prefix followed by the numeric id.
    #[serde(default = "default_article_base_url")]
    pub article_base_url: String,

    /// Ids up to and including this value use the legacy page layout.
    #[serde(default = "default_schema_threshold")]
    pub schema_threshold: i64,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub images: ImageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub executable: Option<String>,
    pub legacy_navigation_timeout_ms: u64,
    pub modern_navigation_timeout_ms: u64,
    pub legacy_settle_ms: u64,
    pub scroll_step_px: u32,
    pub scroll_interval_ms: u64,
    pub max_scroll_ticks: u32,
    pub post_scroll_settle_ms: u64,
    pub reveal_settle_ms: u64,
    pub code_card_settle_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            legacy_navigation_timeout_ms: 30_000,
            modern_navigation_timeout_ms: 60_000,
            legacy_settle_ms: 1_500,
            scroll_step_px: 100,
            scroll_interval_ms: 50,
            max_scroll_ticks: 1_000,
            post_scroll_settle_ms: 2_000,
            reveal_settle_ms: 500,
            code_card_settle_ms: 1_000,
        }
    }
}

impl BrowserSettings {
    pub fn legacy_navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.legacy_navigation_timeout_ms)
    }

    pub fn modern_navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.modern_navigation_timeout_ms)
    }

    /// All delays zeroed, for driving fake pages in tests.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            legacy_settle_ms: 0,
            scroll_interval_ms: 0,
            post_scroll_settle_ms: 0,
            reveal_settle_ms: 0,
            code_card_settle_ms: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub referer: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0".to_string(),
            referer: "https://xz.aliyun.com/".to_string(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_db_path() -> String {
    data_dir().join("articles.db").to_string_lossy().to_string()
}

fn default_image_dir() -> String {
    data_dir()
        .join("static")
        .join("images")
        .to_string_lossy()
        .to_string()
}

fn default_image_url_prefix() -> String {
    "/static/images".to_string()
}

fn default_log_dir() -> String {
    data_dir().join("scraperLogs").to_string_lossy().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_article_base_url() -> String {
    "https://xz.aliyun.com/news/".to_string()
}

fn default_schema_threshold() -> i64 {
    16567
}

fn default_workers() -> usize {
    5
}

fn default_task_timeout() -> u64 {
    180
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            image_dir: default_image_dir(),
            image_url_prefix: default_image_url_prefix(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
            article_base_url: default_article_base_url(),
            schema_threshold: default_schema_threshold(),
            workers: default_workers(),
            task_timeout_secs: default_task_timeout(),
            browser: BrowserSettings::default(),
            images: ImageSettings::default(),
        }
    }
}

impl Config {
    /// Loads the config at `path`, or the default location when `None`.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Creates the directories the store, image cache and logs live in.
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = Path::new(&self.db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.image_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    pub fn article_url(&self, id: i64) -> String {
        format!("{}{}", self.article_base_url, id)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}
