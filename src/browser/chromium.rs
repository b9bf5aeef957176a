use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::BrowserSettings;
use crate::error::{AppError, Result};

use super::{BrowserLauncher, RenderingAgent, WaitCondition};

const READY_POLL: Duration = Duration::from_millis(50);
const BLANK_PAGE: &str = "about:blank";
const READY_STATE_JS: &str = "({ state: document.readyState, href: location.href })";

fn browser_err(e: impl std::fmt::Display) -> AppError {
    AppError::Browser(e.to_string())
}

/// Launches one headless Chromium process per session, so a hung or
/// crashed renderer only takes its own article down.
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Agent = ChromiumAgent;

    async fn launch(&self) -> Result<ChromiumAgent> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.settings.modern_navigation_timeout())
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(AppError::Browser)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;

        // Spawn a handler to process browser events
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page(BLANK_PAGE).await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(browser_err(e));
            }
        };

        Ok(ChromiumAgent {
            browser: Mutex::new(browser),
            page,
            handler_task,
        })
    }
}

pub struct ChromiumAgent {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumAgent {
    async fn wait_until(&self, wait: WaitCondition) {
        loop {
            // the execution context is torn down mid-navigation, so a failed
            // read only means "not yet"
            if let Ok(snapshot) = self.evaluate(READY_STATE_JS).await {
                if navigation_ready(wait, &snapshot) {
                    return;
                }
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }
}

/// The blank start page and Chromium's error page never count as the
/// navigation target, however ready they report themselves.
fn navigation_ready(wait: WaitCondition, snapshot: &serde_json::Value) -> bool {
    let href = snapshot["href"].as_str().unwrap_or_default();
    let state = snapshot["state"].as_str().unwrap_or_default();
    !href.is_empty()
        && href != BLANK_PAGE
        && !href.starts_with("chrome-error:")
        && wait.reached_by(state)
}

#[async_trait]
impl RenderingAgent for ChromiumAgent {
    type Element = Element;

    async fn navigate(&self, url: &str, timeout: Duration, wait: WaitCondition) -> Result<()> {
        tokio::time::timeout(timeout, async {
            // goto only resolves once every frame fired "load", so readiness
            // is polled alongside it
            let goto = self.page.goto(url);
            tokio::pin!(goto);
            tokio::select! {
                result = &mut goto => match result {
                    Ok(_) => {
                        self.wait_until(wait).await;
                        Ok(())
                    }
                    Err(e) => Err(browser_err(e)),
                },
                () = self.wait_until(wait) => Ok(()),
            }
        })
        .await
        .map_err(|_| {
            AppError::Timeout(format!("navigation to {} after {}ms", url, timeout.as_millis()))
        })?
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let mut params = EvaluateParams::new(script);
        params.return_by_value = Some(true);
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(browser_err)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn query_selector(&self, css: &str) -> Result<Option<Element>> {
        Ok(self.query_selector_all(css).await?.into_iter().next())
    }

    async fn query_selector_all(&self, css: &str) -> Result<Vec<Element>> {
        self.page.find_elements(css).await.map_err(browser_err)
    }

    async fn inner_text(&self, element: &Element) -> Result<String> {
        Ok(element
            .inner_text()
            .await
            .map_err(browser_err)?
            .unwrap_or_default())
    }

    async fn inner_html(&self, element: &Element) -> Result<String> {
        Ok(element
            .inner_html()
            .await
            .map_err(browser_err)?
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(browser_err)?;
        browser.wait().await?;
        self.handler_task.abort();
        Ok(())
    }
}

impl Drop for ChromiumAgent {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
