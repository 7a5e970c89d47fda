use super::{build_search_url, PageSource};
use crate::config::FeedSelectors;
use crate::error::{RankError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, trace, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.127 Safari/537.36";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// CDP events chromiumoxide cannot decode; the handler keeps running after them.
/// See mattsse/chromiumoxide#167 and #229.
fn is_benign_handler_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

impl From<CdpError> for RankError {
    fn from(e: CdpError) -> Self {
        RankError::Browser(e.to_string())
    }
}

/// Headless Chromium session. One browser per run, one tab per search.
pub struct ChromeSource {
    base_url: String,
    selectors: FeedSelectors,
    load_timeout: Duration,
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
}

impl ChromeSource {
    pub fn new(base_url: String, selectors: FeedSelectors, load_timeout: Duration) -> Self {
        Self {
            base_url,
            selectors,
            load_timeout,
            browser: None,
            handler_task: None,
        }
    }

    fn browser(&self) -> Result<&Browser> {
        self.browser
            .as_ref()
            .ok_or_else(|| RankError::Session("browser is not running".to_string()))
    }

    /// Polls for `selector` until it shows up or the load timeout passes.
    async fn wait_for_element(&self, page: &Page, selector: &str) -> Result<Element> {
        let start = Instant::now();

        loop {
            match page.find_element(selector).await {
                Ok(element) => {
                    debug!("{} appeared after {:?}", selector, start.elapsed());
                    return Ok(element);
                }
                Err(e) => {
                    let e = RankError::from(e);
                    if e.is_session_failure() {
                        return Err(e);
                    }
                    if start.elapsed() >= self.load_timeout {
                        return Err(RankError::LoadTimeout(self.load_timeout.as_secs()));
                    }
                }
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Moves `page` into the results iframe's own document so that its
    /// content is the list markup.
    async fn enter_results_frame(&self, page: &Page, search_url: &str, frame: &str) -> Result<()> {
        let element = self.wait_for_element(page, frame).await?;
        let src = element
            .attribute("src")
            .await?
            .ok_or_else(|| RankError::Browser(format!("{} has no src", frame)))?;

        let frame_url = Url::parse(search_url)
            .and_then(|base| base.join(&src))
            .map_err(|e| RankError::Browser(format!("bad frame url {}: {}", src, e)))?;

        debug!("Following results frame to {}", frame_url);
        page.goto(frame_url.as_str()).await?;
        Ok(())
    }

    async fn wait_for_feed(&self, page: &Page, search_url: &str) -> Result<()> {
        if let Some(frame) = &self.selectors.frame {
            self.enter_results_frame(page, search_url, frame).await?;
        }
        self.wait_for_element(page, &self.selectors.container).await?;
        Ok(())
    }

    fn scroll_script(&self) -> Result<String> {
        let selector = serde_json::to_string(&self.selectors.container)?;
        Ok(format!(
            "(() => {{ const el = document.querySelector({selector}); \
             if (el) {{ el.scrollTo(0, el.scrollHeight); }} }})()"
        ))
    }
}

#[async_trait]
impl PageSource for ChromeSource {
    type Page = Page;

    async fn start(&mut self) -> Result<()> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--log-level=3")
            .arg(format!("--user-agent={}", USER_AGENT));

        if let Ok(path) = std::env::var("CHROMIUM_PATH") {
            info!("Using browser from CHROMIUM_PATH: {}", path);
            builder = builder.chrome_executable(PathBuf::from(path));
        }

        let config = builder.build().map_err(RankError::Session)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RankError::Session(format!("failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let message = e.to_string();
                    if is_benign_handler_error(&message) {
                        trace!("Ignored undecodable CDP event: {}", message);
                    } else {
                        error!("Browser handler error: {:?}", e);
                    }
                }
            }
            debug!("Browser event handler finished");
        });

        info!("Launched headless browser");
        self.browser = Some(browser);
        self.handler_task = Some(handler_task);
        Ok(())
    }

    async fn open(&mut self, query: &str) -> Result<Page> {
        let url = build_search_url(&self.base_url, query)?;
        debug!("Opening {}", url);

        let page = self.browser()?.new_page(url.as_str()).await?;

        if let Err(e) = self.wait_for_feed(&page, &url).await {
            if let Err(close_err) = page.close().await {
                debug!("Closing failed page: {}", close_err);
            }
            return Err(e);
        }

        Ok(page)
    }

    async fn current_items_html(&mut self, page: &mut Page) -> Result<String> {
        Ok(page.content().await?)
    }

    async fn scroll_to_bottom(&mut self, page: &mut Page) -> Result<()> {
        let script = self.scroll_script()?;
        page.evaluate(script.as_str()).await?;
        Ok(())
    }

    async fn close(&mut self, page: Page) -> Result<()> {
        page.close().await?;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut browser) = self.browser.take() {
            info!("Shutting down browser");

            if let Err(e) = browser.close().await {
                warn!("Failed to close browser cleanly: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to wait for browser exit: {}", e);
            }
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        Ok(())
    }
}
