use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::instrument::WithSubscriber;

use crate::browser::BrowserLauncher;
use crate::error::{AppError, Result};
use crate::logging::RunLogger;
use crate::models::{RunReport, ScrapeOutcome};

use super::Harvester;

fn banner() {
    tracing::info!("{}", "=".repeat(60));
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

impl<L: BrowserLauncher + 'static> Harvester<L> {
    /// Harvests every id in `start..=end` with at most `workers` tasks in
    /// flight. Only invalid arguments fail the run; per-id failures are
    /// counted and logged.
    pub async fn run(
        self: &Arc<Self>,
        start: i64,
        end: i64,
        workers: usize,
        logger: &RunLogger,
    ) -> Result<RunReport> {
        if start > end {
            return Err(AppError::InvalidRange { start, end });
        }
        if workers == 0 {
            return Err(AppError::InvalidWorkers(workers));
        }

        let dispatch = logger.dispatch().clone();
        Arc::clone(self)
            .run_range(start, end, workers, dispatch.clone())
            .with_subscriber(dispatch)
            .await
    }

    async fn run_range(
        self: Arc<Self>,
        start: i64,
        end: i64,
        workers: usize,
        dispatch: tracing::Dispatch,
    ) -> Result<RunReport> {
        banner();
        tracing::info!("Start from {} to {} (workers: {})", start, end, workers);
        tracing::info!("Image dir: {}", self.images.dir().display());
        banner();

        let timeout = self.config.task_timeout();
        let mut tasks = stream::iter(start..=end)
            .map(|id| {
                let harvester = Arc::clone(&self);
                let handle = tokio::spawn(
                    async move {
                        match tokio::time::timeout(timeout, harvester.process(id)).await {
                            Ok(outcome) => outcome,
                            Err(_) => ScrapeOutcome::Error(format!(
                                "timed out after {}s",
                                timeout.as_secs()
                            )),
                        }
                    }
                    .with_subscriber(dispatch.clone()),
                );
                async move {
                    // a panicking task surfaces here as a JoinError
                    let outcome = handle
                        .await
                        .unwrap_or_else(|e| ScrapeOutcome::Error(format!("task failed: {}", e)));
                    (id, outcome)
                }
            })
            .buffer_unordered(workers);

        let mut report = RunReport::default();
        while let Some((id, outcome)) = tasks.next().await {
            tracing::debug!(id, outcome = outcome.label(), "task finished");
            match &outcome {
                ScrapeOutcome::Exists => {}
                ScrapeOutcome::Skip(reason) => {
                    tracing::warn!("ID {}: {}, skipped", id, reason);
                }
                ScrapeOutcome::Error(message) => {
                    tracing::error!("ID {}: ERROR - {}", id, message);
                }
                ScrapeOutcome::Success(record) => {
                    tracing::info!("ID {}: {}", id, truncate(&record.title, 30));
                }
            }
            report.summary.record(&outcome);
            report.completed.push(id);
        }

        let summary = report.summary;
        banner();
        tracing::info!(
            total = summary.total(),
            success = summary.success,
            exists = summary.exists,
            skip = summary.skip,
            error = summary.error,
            "Run summary"
        );
        tracing::info!("OK: {}", summary.success);
        tracing::info!("EXISTS: {} (already in database)", summary.exists);
        tracing::info!("SKIP: {} (blank)", summary.skip);
        tracing::info!("ERROR: {}", summary.error);
        banner();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;
    use tokio_test::assert_ok;

    use super::super::test_support::{article_page, harvester, harvester_with, test_config, url};
    use super::*;
    use crate::browser::fake::FakePage;
    use crate::config::Config;
    use crate::models::{ArticleRecord, RunSummary};
    use crate::services::FakeFetcher;

    fn existing(id: i64) -> ArticleRecord {
        ArticleRecord {
            id,
            title: "Already here".to_string(),
            author: "dave".to_string(),
            url: url(id),
            category: None,
            content_html: "<p>old</p>".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn mixed_range_counts_each_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let (harvester, _launcher, repo) = harvester(
            vec![
                (11, article_page("Eleven", "<p>ok</p>")),
                (12, article_page("", "<p>blank</p>")),
            ],
            FakeFetcher::default(),
            dir.path(),
        )
        .await;
        assert!(repo.save_article(&existing(10)).await);

        let report = assert_ok!(harvester.run(10, 12, 2, &RunLogger::disabled()).await);

        assert_eq!(
            report.summary,
            RunSummary {
                exists: 1,
                skip: 1,
                error: 0,
                success: 1
            }
        );
        assert!(repo.article_exists(10).await.unwrap());
        assert!(repo.article_exists(11).await.unwrap());
        assert!(!repo.article_exists(12).await.unwrap());
        assert_eq!(repo.count_articles().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_id_processed_once() {
        let dir = tempfile::tempdir().unwrap();
        let pages = (1..=20)
            .map(|id| (id, article_page(&format!("Title {}", id), "<p>x</p>")))
            .collect();
        let (harvester, launcher, _repo) =
            harvester(pages, FakeFetcher::default(), dir.path()).await;

        let report = harvester.run(1, 20, 3, &RunLogger::disabled()).await.unwrap();

        assert_eq!(report.summary.total(), 20);
        assert_eq!(report.summary.success, 20);
        let unique: HashSet<i64> = report.completed.iter().copied().collect();
        assert_eq!(unique.len(), 20);
        assert_eq!(report.completed.len(), 20);
        assert_eq!(launcher.navigations().len(), 20);
    }

    #[tokio::test]
    async fn second_run_is_all_exists() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"<img src="https://img.test/a.png">"#;
        let (harvester, launcher, repo) = harvester(
            vec![
                (1, article_page("One", body)),
                (2, article_page("Two", body)),
            ],
            FakeFetcher::default().with("https://img.test/a.png", 200, b"a"),
            dir.path(),
        )
        .await;

        let first = harvester.run(1, 2, 2, &RunLogger::disabled()).await.unwrap();
        assert_eq!(first.summary.success, 2);
        let before = repo.get_article(1).await.unwrap().unwrap();

        let second = harvester.run(1, 2, 2, &RunLogger::disabled()).await.unwrap();
        assert_eq!(second.summary.exists, 2);
        assert_eq!(second.summary.total(), 2);
        assert_eq!(launcher.launches(), 2);

        let after = repo.get_article(1).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_task_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let (harvester, _launcher, _repo) = harvester(
            vec![
                (1, article_page("One", "<p>1</p>")),
                (2, FakePage::new().panicking()),
                (3, FakePage::new().failing()),
                (4, article_page("Four", "<p>4</p>")),
            ],
            FakeFetcher::default(),
            dir.path(),
        )
        .await;

        let report = harvester.run(1, 4, 2, &RunLogger::disabled()).await.unwrap();
        assert_eq!(report.summary.success, 2);
        assert_eq!(report.summary.error, 2);
    }

    #[tokio::test]
    async fn hung_task_times_out_without_stopping_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            task_timeout_secs: 1,
            ..test_config()
        };
        let (harvester, _launcher, repo) = harvester_with(
            config,
            vec![
                (1, article_page("One", "<p>1</p>")),
                (2, FakePage::new().hanging()),
                (3, article_page("Three", "<p>3</p>")),
            ],
            FakeFetcher::default(),
            dir.path(),
        )
        .await;

        let report = harvester.run(1, 3, 3, &RunLogger::disabled()).await.unwrap();

        assert_eq!(report.summary.success, 2);
        assert_eq!(report.summary.error, 1);
        assert_eq!(report.completed.last(), Some(&2));
        assert!(!repo.article_exists(2).await.unwrap());
        assert!(repo.article_exists(3).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_bad_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let (harvester, launcher, _repo) =
            harvester(vec![], FakeFetcher::default(), dir.path()).await;

        assert!(matches!(
            harvester.run(5, 4, 1, &RunLogger::disabled()).await,
            Err(AppError::InvalidRange { start: 5, end: 4 })
        ));
        assert!(matches!(
            harvester.run(1, 4, 0, &RunLogger::disabled()).await,
            Err(AppError::InvalidWorkers(0))
        ));
        assert_eq!(launcher.launches(), 0);
    }

    #[tokio::test]
    async fn summary_is_written_to_run_log() {
        let dir = tempfile::tempdir().unwrap();
        let logs = tempfile::tempdir().unwrap();
        let (harvester, _launcher, _repo) = harvester(
            vec![(7, article_page("Seven", "<p>7</p>"))],
            FakeFetcher::default(),
            dir.path(),
        )
        .await;
        let logger = RunLogger::create(logs.path(), "info").unwrap();

        harvester.run(6, 7, 1, &logger).await.unwrap();

        let contents = std::fs::read_to_string(logger.path().unwrap()).unwrap();
        assert!(contents.contains("Run summary"));
        assert!(contents.contains("OK: 1"));
        assert!(contents.contains("SKIP: 1 (blank)"));
        assert!(contents.contains("ID 7: Seven"));
    }
}
