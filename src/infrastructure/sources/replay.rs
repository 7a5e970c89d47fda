use super::PageSource;
use crate::error::{RankError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scripted behaviour of one query.
#[derive(Clone)]
pub enum ReplayFeed {
    /// One markup frame per scroll; the last frame repeats once reached.
    Frames(Vec<String>),
    /// Markup as a function of the number of scrolls so far.
    Growing(fn(usize) -> String),
    LoadTimeout,
    /// Opens fine, then the session dies on the first read.
    SessionDies,
    /// Opens fine, then every read fails with a non-fatal error.
    Broken,
    /// Opens fine, then the first read panics.
    Panics,
}

#[derive(Default, Debug)]
pub struct ReplayStats {
    pub starts: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub opens: AtomicUsize,
    pub reads: AtomicUsize,
    pub scrolls: AtomicUsize,
    pub closes: AtomicUsize,
}

pub struct ReplayPage {
    feed: ReplayFeed,
    scrolls: usize,
}

/// Deterministic `PageSource` that plays back scripted feeds per query.
#[derive(Default)]
pub struct ReplaySource {
    feeds: HashMap<String, ReplayFeed>,
    fail_start: bool,
    stats: Arc<ReplayStats>,
}

impl ReplaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, query: &str, feed: ReplayFeed) -> Self {
        self.feeds.insert(query.to_string(), feed);
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn stats(&self) -> Arc<ReplayStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl PageSource for ReplaySource {
    type Page = ReplayPage;

    async fn start(&mut self) -> Result<()> {
        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(RankError::Session("browser failed to launch".to_string()));
        }
        Ok(())
    }

    async fn open(&mut self, query: &str) -> Result<ReplayPage> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        let feed = self
            .feeds
            .get(query)
            .cloned()
            .unwrap_or(ReplayFeed::Frames(vec![String::new()]));

        if let ReplayFeed::LoadTimeout = feed {
            return Err(RankError::LoadTimeout(10));
        }
        Ok(ReplayPage { feed, scrolls: 0 })
    }

    async fn current_items_html(&mut self, page: &mut ReplayPage) -> Result<String> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        match &page.feed {
            ReplayFeed::Frames(frames) => Ok(frames
                .get(page.scrolls.min(frames.len().saturating_sub(1)))
                .cloned()
                .unwrap_or_default()),
            ReplayFeed::Growing(render) => Ok(render(page.scrolls)),
            ReplayFeed::LoadTimeout => Err(RankError::LoadTimeout(10)),
            ReplayFeed::SessionDies => Err(RankError::Session("target crashed".to_string())),
            ReplayFeed::Broken => Err(RankError::Other("evaluation failed".to_string())),
            ReplayFeed::Panics => panic!("page script crashed the reader"),
        }
    }

    async fn scroll_to_bottom(&mut self, page: &mut ReplayPage) -> Result<()> {
        self.stats.scrolls.fetch_add(1, Ordering::SeqCst);
        page.scrolls += 1;
        Ok(())
    }

    async fn close(&mut self, _page: ReplayPage) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.stats.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
