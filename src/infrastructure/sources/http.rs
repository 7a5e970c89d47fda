use super::{build_search_url, PageSource};
use crate::error::{RankError, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

pub struct HttpPage {
    html: String,
}

/// Fetches server-rendered result markup with a plain HTTP GET.
///
/// Nothing is lazily loaded here, so scrolling never realizes new items and
/// the resolver ends the search as soon as it sees the feed stop growing.
pub struct HttpSource {
    client: Client,
    base_url: String,
    container: Selector,
    load_timeout: Duration,
}

impl HttpSource {
    pub fn new(base_url: String, container: &str, load_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(load_timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;
        let container =
            Selector::parse(container).map_err(|e| RankError::Selector(e.to_string()))?;

        info!("Created HTTP page source for {}", base_url);
        Ok(Self {
            client,
            base_url,
            container,
            load_timeout,
        })
    }

    fn has_container(&self, html: &str) -> bool {
        Html::parse_document(html)
            .select(&self.container)
            .next()
            .is_some()
    }
}

#[async_trait]
impl PageSource for HttpSource {
    type Page = HttpPage;

    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    async fn open(&mut self, query: &str) -> Result<HttpPage> {
        let url = build_search_url(&self.base_url, query)?;
        debug!("GET {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(RankError::LoadTimeout(self.load_timeout.as_secs()))
            }
            Err(e) => return Err(e.into()),
        };

        if !response.status().is_success() {
            return Err(RankError::Other(format!(
                "{} answered with status {}",
                url,
                response.status()
            )));
        }

        let html = response.text().await?;
        if !self.has_container(&html) {
            return Err(RankError::LoadTimeout(self.load_timeout.as_secs()));
        }

        Ok(HttpPage { html })
    }

    async fn current_items_html(&mut self, page: &mut HttpPage) -> Result<String> {
        Ok(page.html.clone())
    }

    async fn scroll_to_bottom(&mut self, _page: &mut HttpPage) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self, _page: HttpPage) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
