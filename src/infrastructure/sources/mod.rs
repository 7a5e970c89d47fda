use crate::error::{RankError, Result};
use async_trait::async_trait;
use reqwest::Url;

#[cfg(feature = "browser")]
pub(crate) mod chrome;
pub(crate) mod http;
#[cfg(test)]
pub(crate) mod replay;

/// A remote, lazily rendered results feed.
///
/// `start` and `shutdown` bracket one browsing session; the runner calls each
/// exactly once per run. Between them, every job `open`s its own page and
/// drives it with `current_items_html` and `scroll_to_bottom`. Realized items
/// only ever grow and keep their order across scrolls.
#[async_trait]
pub trait PageSource: Send {
    type Page: Send;

    async fn start(&mut self) -> Result<()>;

    /// Loads the results for `query`, failing with `RankError::LoadTimeout`
    /// when the feed does not appear in time.
    async fn open(&mut self, query: &str) -> Result<Self::Page>;

    /// Markup of the currently realized part of the feed.
    async fn current_items_html(&mut self, page: &mut Self::Page) -> Result<String>;

    /// Asks the feed to realize more items. Returns without waiting for them.
    async fn scroll_to_bottom(&mut self, page: &mut Self::Page) -> Result<()>;

    async fn close(&mut self, page: Self::Page) -> Result<()>;

    async fn shutdown(&mut self) -> Result<()>;
}

/// Appends the keyword to the search URL as a single path segment.
pub fn build_search_url(base_url: &str, keyword: &str) -> Result<String> {
    let mut url =
        Url::parse(base_url).map_err(|e| RankError::Config(format!("{}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| RankError::Config(format!("{} cannot take a path", base_url)))?
        .pop_if_empty()
        .push(keyword.trim());
    Ok(url.to_string())
}
