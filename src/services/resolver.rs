use crate::domain::{RankOutcome, ResolveStatus, SearchJob};
use crate::error::{RankError, Result};
use crate::infrastructure::{PageSource, ParsedFeed, ResultItemParser};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Upper bound on parse iterations per search, scrolls included.
    pub max_scrolls: u32,
    /// Pause after each scroll so lazy-loaded items can render.
    pub settle: Duration,
    /// Consecutive iterations without a feed container tolerated before the
    /// search is reported as a parse anomaly.
    pub anomaly_retries: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_scrolls: 50,
            settle: Duration::from_secs(1),
            anomaly_retries: 5,
        }
    }
}

/// Finds the rank of one shop by scrolling a feed and re-scanning everything
/// realized so far on every iteration.
pub struct RankResolver {
    parser: ResultItemParser,
    settings: ResolverSettings,
}

impl RankResolver {
    pub fn new(parser: ResultItemParser, settings: ResolverSettings) -> Self {
        Self { parser, settings }
    }

    /// Always yields an outcome. Failures become non-found outcomes whose
    /// status tells the runner whether the session is still usable.
    pub async fn resolve<S: PageSource>(&self, source: &mut S, job: &SearchJob) -> RankOutcome {
        info!("Searching {}", job);

        let mut page = match source.open(&job.keyword).await {
            Ok(page) => page,
            Err(e) => return self.failed(job, e),
        };

        let scanned = self.scan(source, &mut page, job).await;

        if let Err(e) = source.close(page).await {
            debug!("Closing page for {} failed: {}", job, e);
        }

        match scanned {
            Ok(outcome) => outcome,
            Err(e) => self.failed(job, e),
        }
    }

    async fn scan<S: PageSource>(
        &self,
        source: &mut S,
        page: &mut S::Page,
        job: &SearchJob,
    ) -> Result<RankOutcome> {
        let target = normalize_name(&job.shop_name);
        let mut previous_len: Option<usize> = None;
        let mut missing_container = 0;

        for iteration in 1..=self.settings.max_scrolls {
            let html = source.current_items_html(page).await?;
            let feed = self.parser.parse(&html);

            if let Some(rank) = rank_of(&feed, &target) {
                info!("{} is ranked {} (iteration {})", job, rank, iteration);
                return Ok(RankOutcome::found(job.clone(), rank));
            }

            if feed.container_present {
                missing_container = 0;
                let realized = feed.realized_len();
                if previous_len.is_some_and(|previous| realized <= previous) {
                    info!(
                        "{} not found; feed stopped growing at {} items (iteration {})",
                        job, realized, iteration
                    );
                    return Ok(RankOutcome::missing(job.clone(), ResolveStatus::NotFound));
                }
                debug!("{}: {} items realized", job, realized);
                previous_len = Some(realized);
            } else {
                missing_container += 1;
                if missing_container > self.settings.anomaly_retries {
                    warn!(
                        "{}: feed container missing for {} consecutive iterations",
                        job, missing_container
                    );
                    return Ok(RankOutcome::missing(
                        job.clone(),
                        ResolveStatus::ParseAnomaly,
                    ));
                }
                debug!("{}: feed container not rendered yet", job);
            }

            if iteration == self.settings.max_scrolls {
                break;
            }
            source.scroll_to_bottom(page).await?;
            sleep(self.settings.settle).await;
        }

        warn!(
            "{} not found within {} scroll iterations",
            job, self.settings.max_scrolls
        );
        Ok(RankOutcome::missing(
            job.clone(),
            ResolveStatus::ScrollBudgetExhausted,
        ))
    }

    fn failed(&self, job: &SearchJob, e: RankError) -> RankOutcome {
        let status = if e.is_session_failure() {
            error!("Browsing session failed during {}: {}", job, e);
            ResolveStatus::SessionFailure
        } else if let RankError::LoadTimeout(_) = e {
            warn!("Results did not load for {}: {}", job, e);
            ResolveStatus::LoadTimeout
        } else {
            error!("Search for {} failed: {}", job, e);
            ResolveStatus::Errored
        };
        RankOutcome::missing(job.clone(), status)
    }
}

/// Walks the realized entries from the top, counting only non-advertisement
/// entries. The first entry whose name equals `target` wins.
fn rank_of(feed: &ParsedFeed, target: &str) -> Option<u32> {
    let mut rank = 0;
    for entry in &feed.entries {
        if entry.is_advertisement {
            continue;
        }
        rank += 1;
        debug_assert_eq!(entry.position_in_page, Some(rank));
        if normalize_name(&entry.display_name) == target {
            return Some(rank);
        }
    }
    None
}

/// Trimmed, NFC-composed name. Case and inner whitespace are kept as-is.
fn normalize_name(name: &str) -> String {
    name.trim().nfc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedSelectors;
    use crate::infrastructure::parser::tests::feed_html;
    use crate::infrastructure::sources::replay::{ReplayFeed, ReplaySource};
    use std::sync::atomic::Ordering::SeqCst;

    fn resolver(max_scrolls: u32) -> RankResolver {
        RankResolver::new(
            ResultItemParser::new(&FeedSelectors::default()).unwrap(),
            ResolverSettings {
                max_scrolls,
                settle: Duration::ZERO,
                anomaly_retries: 3,
            },
        )
    }

    fn job(shop: &str) -> SearchJob {
        SearchJob::new("강남 맛집", shop)
    }

    /// Feed with `n` numbered shops, every third one an advertisement.
    fn numbered_feed(n: usize) -> String {
        let names: Vec<String> = (0..n).map(|i| format!("shop {}", i)).collect();
        let items: Vec<(&str, bool)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i % 3 == 0))
            .collect();
        feed_html(&items)
    }

    #[tokio::test]
    async fn ads_are_skipped_when_ranking() {
        let html = feed_html(&[("광고1", true), ("A", false), ("광고2", true), ("B", false)]);
        let mut source =
            ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Frames(vec![html]));

        let outcome = resolver(50).resolve(&mut source, &job("B")).await;
        assert_eq!(outcome.status, ResolveStatus::Found);
        assert_eq!(outcome.rank, Some(2));
    }

    #[tokio::test]
    async fn advertisement_is_never_a_match() {
        let html = feed_html(&[("B", true), ("A", false), ("B", false)]);
        let mut source =
            ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Frames(vec![html]));

        let outcome = resolver(50).resolve(&mut source, &job("B")).await;
        assert_eq!(outcome.rank, Some(2));
    }

    #[tokio::test]
    async fn first_match_wins() {
        let html = feed_html(&[("A", false), ("B", false), ("C", false), ("B", false)]);
        let mut source =
            ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Frames(vec![html]));

        let outcome = resolver(50).resolve(&mut source, &job("B")).await;
        assert_eq!(outcome.rank, Some(2));
    }

    #[tokio::test]
    async fn match_is_case_sensitive_and_trimmed() {
        let html = feed_html(&[("cafe one", false), ("Cafe One", false)]);
        let mut source =
            ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Frames(vec![html]));

        let outcome = resolver(50).resolve(&mut source, &job("  Cafe One ")).await;
        assert_eq!(outcome.rank, Some(2));
    }

    #[tokio::test]
    async fn decomposed_hangul_matches_composed_target() {
        let decomposed: String = "봉피양".nfd().collect();
        let html = feed_html(&[(decomposed.as_str(), false)]);
        let mut source =
            ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Frames(vec![html]));

        let outcome = resolver(50).resolve(&mut source, &job("봉피양")).await;
        assert_eq!(outcome.rank, Some(1));
    }

    #[tokio::test]
    async fn target_found_after_scrolling() {
        let frames = vec![
            feed_html(&[("광고", true), ("A", false), ("B", false)]),
            feed_html(&[("광고", true), ("A", false), ("B", false), ("광고", true), ("C", false)]),
            feed_html(&[
                ("광고", true),
                ("A", false),
                ("B", false),
                ("광고", true),
                ("C", false),
                ("D", false),
            ]),
        ];
        let mut source = ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Frames(frames));
        let stats = source.stats();

        let outcome = resolver(50).resolve(&mut source, &job("D")).await;
        assert_eq!(outcome.rank, Some(4));
        assert_eq!(stats.reads.load(SeqCst), 3);
        assert_eq!(stats.scrolls.load(SeqCst), 2);
        assert_eq!(stats.closes.load(SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_early_when_feed_stops_growing() {
        let frames = vec![
            feed_html(&[("A", false), ("B", false)]),
            feed_html(&[("A", false), ("B", false), ("C", false)]),
        ];
        let mut source = ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Frames(frames));
        let stats = source.stats();

        let outcome = resolver(50).resolve(&mut source, &job("Z")).await;
        assert_eq!(outcome.status, ResolveStatus::NotFound);
        assert_eq!(outcome.rank, None);
        assert_eq!(stats.reads.load(SeqCst), 3);
        assert!(stats.reads.load(SeqCst) < 50);
    }

    #[tokio::test]
    async fn empty_rendered_feed_is_not_found() {
        let mut source = ReplaySource::new()
            .with_feed("강남 맛집", ReplayFeed::Frames(vec![feed_html(&[])]));
        let stats = source.stats();

        let outcome = resolver(50).resolve(&mut source, &job("A")).await;
        assert_eq!(outcome.status, ResolveStatus::NotFound);
        assert_eq!(stats.reads.load(SeqCst), 2);
    }

    #[tokio::test]
    async fn growing_feed_uses_exactly_the_scroll_budget() {
        let mut source = ReplaySource::new().with_feed(
            "강남 맛집",
            ReplayFeed::Growing(|scrolls| numbered_feed(3 * (scrolls + 1))),
        );
        let stats = source.stats();

        let outcome = resolver(50).resolve(&mut source, &job("never there")).await;
        assert_eq!(outcome.status, ResolveStatus::ScrollBudgetExhausted);
        assert!(!outcome.is_found());
        assert_eq!(stats.reads.load(SeqCst), 50);
        assert_eq!(stats.scrolls.load(SeqCst), 49);
    }

    #[tokio::test]
    async fn found_on_the_last_allowed_iteration() {
        // "shop 29" sits at raw index 29, realized once 30 items are loaded.
        let mut source = ReplaySource::new().with_feed(
            "강남 맛집",
            ReplayFeed::Growing(|scrolls| numbered_feed(3 * (scrolls + 1))),
        );

        let outcome = resolver(10).resolve(&mut source, &job("shop 29")).await;
        assert_eq!(outcome.status, ResolveStatus::Found);
        assert_eq!(outcome.rank, Some(20));
    }

    #[tokio::test]
    async fn late_container_is_waited_for() {
        let frames = vec![
            "<html><body>loading</body></html>".to_string(),
            "<html><body>loading</body></html>".to_string(),
            feed_html(&[("A", false), ("B", false)]),
        ];
        let mut source = ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Frames(frames));

        let outcome = resolver(50).resolve(&mut source, &job("B")).await;
        assert_eq!(outcome.rank, Some(2));
    }

    #[tokio::test]
    async fn missing_container_becomes_parse_anomaly() {
        let mut source = ReplaySource::new().with_feed(
            "강남 맛집",
            ReplayFeed::Frames(vec!["<html><body></body></html>".to_string()]),
        );
        let stats = source.stats();

        let outcome = resolver(50).resolve(&mut source, &job("A")).await;
        assert_eq!(outcome.status, ResolveStatus::ParseAnomaly);
        assert_eq!(stats.reads.load(SeqCst), 4);
    }

    #[tokio::test]
    async fn load_timeout_is_reported() {
        let mut source = ReplaySource::new().with_feed("강남 맛집", ReplayFeed::LoadTimeout);
        let stats = source.stats();

        let outcome = resolver(50).resolve(&mut source, &job("A")).await;
        assert_eq!(outcome.status, ResolveStatus::LoadTimeout);
        assert_eq!(stats.reads.load(SeqCst), 0);
    }

    #[tokio::test]
    async fn read_errors_are_contained() {
        let mut source = ReplaySource::new().with_feed("강남 맛집", ReplayFeed::Broken);
        let stats = source.stats();

        let outcome = resolver(50).resolve(&mut source, &job("A")).await;
        assert_eq!(outcome.status, ResolveStatus::Errored);
        assert_eq!(stats.closes.load(SeqCst), 1);
    }

    #[tokio::test]
    async fn session_death_is_flagged() {
        let mut source = ReplaySource::new().with_feed("강남 맛집", ReplayFeed::SessionDies);

        let outcome = resolver(50).resolve(&mut source, &job("A")).await;
        assert_eq!(outcome.status, ResolveStatus::SessionFailure);
    }

    #[test]
    fn rescanning_the_same_feed_gives_the_same_ranks() {
        let parser = ResultItemParser::new(&FeedSelectors::default()).unwrap();
        let html = feed_html(&[("광고", true), ("A", false), ("B", false), ("광고", true), ("C", false)]);
        let first = parser.parse(&html);
        let second = parser.parse(&html);

        for name in ["A", "B", "C"] {
            assert_eq!(rank_of(&first, name), rank_of(&second, name));
        }
        assert_eq!(rank_of(&first, "C"), Some(3));
    }
}
