//! Rendering capability: a browser session that can load a page, run
//! scripts in it and read elements back out.

mod chromium;
#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use chromium::ChromiumLauncher;

/// How far a navigation must progress before `navigate` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    DomContentLoaded,
    #[allow(dead_code)]
    Load,
}

impl WaitCondition {
    /// Whether a document reporting `ready_state` has progressed far enough.
    pub fn reached_by(self, ready_state: &str) -> bool {
        match self {
            WaitCondition::DomContentLoaded => {
                ready_state == "interactive" || ready_state == "complete"
            }
            WaitCondition::Load => ready_state == "complete",
        }
    }
}

/// One live page in one browser session.
#[async_trait]
pub trait RenderingAgent: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str, timeout: Duration, wait: WaitCondition) -> Result<()>;

    /// Evaluates a script expression and returns its JSON value
    /// (`Null` for `undefined`).
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    async fn query_selector(&self, css: &str) -> Result<Option<Self::Element>>;

    async fn query_selector_all(&self, css: &str) -> Result<Vec<Self::Element>>;

    async fn inner_text(&self, element: &Self::Element) -> Result<String>;

    async fn inner_html(&self, element: &Self::Element) -> Result<String>;

    async fn close(&self) -> Result<()>;
}

/// Starts a fresh, isolated browser session per call.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Agent: RenderingAgent + 'static;

    async fn launch(&self) -> Result<Self::Agent>;
}
