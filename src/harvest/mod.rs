//! The ingestion pipeline: one task per article id, fanned out over a
//! bounded pool of workers.

mod orchestrator;
mod task;

use std::sync::Arc;

use crate::browser::BrowserLauncher;
use crate::config::Config;
use crate::db::Repository;
use crate::services::ImageCache;

pub struct Harvester<L: BrowserLauncher> {
    config: Config,
    repository: Arc<Repository>,
    launcher: L,
    images: ImageCache,
}

impl<L: BrowserLauncher> Harvester<L> {
    pub fn new(config: Config, repository: Arc<Repository>, launcher: L, images: ImageCache) -> Self {
        Self {
            config,
            repository,
            launcher,
            images,
        }
    }
}
