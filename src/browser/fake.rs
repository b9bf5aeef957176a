use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};

use super::{BrowserLauncher, RenderingAgent, WaitCondition};

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub html: String,
}

/// Canned DOM for one URL. Selectors are matched verbatim.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
    heights: Vec<i64>,
    fail_navigation: bool,
    panic_on_navigation: bool,
    hang_on_navigation: bool,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, css: &str, text: &str, html: &str) -> Self {
        self.elements.entry(css.to_string()).or_default().push(FakeElement {
            text: text.to_string(),
            html: html.to_string(),
        });
        self
    }

    /// Successive values reported for `document.body.scrollHeight`;
    /// the last one repeats.
    pub fn heights(mut self, heights: &[i64]) -> Self {
        self.heights = heights.to_vec();
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_navigation = true;
        self
    }

    /// Navigation never completes.
    pub fn hanging(mut self) -> Self {
        self.hang_on_navigation = true;
        self
    }
}

#[derive(Default)]
struct FakeState {
    pages: HashMap<String, FakePage>,
    launches: AtomicUsize,
    closes: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    scripts: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<FakeState>,
}

impl FakeLauncher {
    pub fn new(pages: impl IntoIterator<Item = (String, FakePage)>) -> Self {
        Self {
            state: Arc::new(FakeState {
                pages: pages.into_iter().collect(),
                ..FakeState::default()
            }),
        }
    }

    pub fn launches(&self) -> usize {
        self.state.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.navigations.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Agent = FakeAgent;

    async fn launch(&self) -> Result<FakeAgent> {
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(FakeAgent {
            state: Arc::clone(&self.state),
            page: Mutex::new(FakePage::default()),
            height_reads: AtomicUsize::new(0),
        })
    }
}

pub struct FakeAgent {
    state: Arc<FakeState>,
    page: Mutex<FakePage>,
    height_reads: AtomicUsize,
}

#[async_trait]
impl RenderingAgent for FakeAgent {
    type Element = FakeElement;

    async fn navigate(&self, url: &str, _timeout: Duration, _wait: WaitCondition) -> Result<()> {
        self.state.navigations.lock().unwrap().push(url.to_string());
        let page = self.state.pages.get(url).cloned().unwrap_or_default();
        if page.panic_on_navigation {
            panic!("renderer crashed on {}", url);
        }
        if page.hang_on_navigation {
            std::future::pending::<()>().await;
        }
        if page.fail_navigation {
            return Err(AppError::Timeout(format!("navigation to {}", url)));
        }
        *self.page.lock().unwrap() = page;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.state.scripts.lock().unwrap().push(script.to_string());
        if script.contains("scrollHeight") {
            let page = self.page.lock().unwrap();
            let read = self.height_reads.fetch_add(1, Ordering::SeqCst);
            let height = page
                .heights
                .get(read)
                .or(page.heights.last())
                .copied()
                .unwrap_or(0);
            return Ok(Value::from(height));
        }
        Ok(Value::Null)
    }

    async fn query_selector(&self, css: &str) -> Result<Option<FakeElement>> {
        Ok(self.query_selector_all(css).await?.into_iter().next())
    }

    async fn query_selector_all(&self, css: &str) -> Result<Vec<FakeElement>> {
        let page = self.page.lock().unwrap();
        Ok(page.elements.get(css).cloned().unwrap_or_default())
    }

    async fn inner_text(&self, element: &FakeElement) -> Result<String> {
        Ok(element.text.clone())
    }

    async fn inner_html(&self, element: &FakeElement) -> Result<String> {
        Ok(element.html.clone())
    }

    async fn close(&self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
