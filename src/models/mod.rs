mod article;
mod outcome;

pub use article::{placeholder_title, ArticleRecord, UNKNOWN_AUTHOR};
pub use outcome::{RunReport, RunSummary, ScrapeOutcome};
