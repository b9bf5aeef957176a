use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::Dispatch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::error::{AppError, Result};

/// Log stream for one harvest run: a timestamped file plus stderr.
///
/// The dispatcher is handed to every worker explicitly instead of being
/// installed globally, so its lifetime is that of the run.
pub struct RunLogger {
    dispatch: Dispatch,
    path: Option<PathBuf>,
}

impl RunLogger {
    pub fn create(log_dir: &Path, level: &str) -> Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!(
            "scraper_{}.log",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let file_filter =
            EnvFilter::try_new(level).map_err(|e| AppError::Config(e.to_string()))?;
        let stderr_filter =
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(stderr_filter),
            );

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            path: Some(path),
        })
    }

    /// Discards everything.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
            path: None,
        }
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
