use serde::Serialize;

use super::ArticleRecord;

/// Classified result of processing one article id.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Exists,
    Skip(String),
    Error(String),
    Success(ArticleRecord),
}

impl ScrapeOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ScrapeOutcome::Exists => "exists",
            ScrapeOutcome::Skip(_) => "skip",
            ScrapeOutcome::Error(_) => "error",
            ScrapeOutcome::Success(_) => "success",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub exists: usize,
    pub skip: usize,
    pub error: usize,
    pub success: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ScrapeOutcome) {
        match outcome {
            ScrapeOutcome::Exists => self.exists += 1,
            ScrapeOutcome::Skip(_) => self.skip += 1,
            ScrapeOutcome::Error(_) => self.error += 1,
            ScrapeOutcome::Success(_) => self.success += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.exists + self.skip + self.error + self.success
    }
}

/// Counters for a run plus the ids in the order their tasks finished.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub summary: RunSummary,
    pub completed: Vec<i64>,
}
