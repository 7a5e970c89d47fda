use crate::config::FeedSelectors;
use crate::error::{RankError, Result};
use scraper::{ElementRef, Html, Selector};

/// One list item of the results feed, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub display_name: String,
    pub is_advertisement: bool,
    /// 1-based position among non-advertisement entries; `None` for ads.
    pub position_in_page: Option<u32>,
}

/// Everything parsed out of one realization of the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Whether the feed container was present at all. An absent container
    /// means the feed has not rendered yet (or the markup changed), which is
    /// different from a rendered but empty feed.
    pub container_present: bool,
    pub entries: Vec<ResultEntry>,
}

impl ParsedFeed {
    /// Number of realized items, advertisements included.
    pub fn realized_len(&self) -> usize {
        self.entries.len()
    }
}

pub struct Selectors {
    pub container: Selector,
    pub item: Selector,
    pub advertisement: Selector,
    pub name: Selector,
}

impl Selectors {
    pub fn new(selectors: &FeedSelectors) -> Result<Self> {
        Ok(Self {
            container: parse_selector(&selectors.container)?,
            item: parse_selector(&selectors.item)?,
            advertisement: parse_selector(&selectors.advertisement)?,
            name: parse_selector(&selectors.name)?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| RankError::Selector(format!("{}: {}", selector, e)))
}

/// Turns realized feed markup into typed entries. Parsing never fails on
/// unexpected markup; missing structure just yields no entries.
pub struct ResultItemParser {
    selectors: Selectors,
}

impl ResultItemParser {
    pub fn new(selectors: &FeedSelectors) -> Result<Self> {
        Ok(Self {
            selectors: Selectors::new(selectors)?,
        })
    }

    pub fn parse(&self, html: &str) -> ParsedFeed {
        let document = Html::parse_document(html);

        let container_present = document.select(&self.selectors.container).next().is_some();

        let mut position = 0;
        let entries = document
            .select(&self.selectors.item)
            .map(|item| {
                let is_advertisement = item.select(&self.selectors.advertisement).next().is_some();
                let position_in_page = if is_advertisement {
                    None
                } else {
                    position += 1;
                    Some(position)
                };

                ResultEntry {
                    display_name: self.display_name(item),
                    is_advertisement,
                    position_in_page,
                }
            })
            .collect();

        ParsedFeed {
            container_present,
            entries,
        }
    }

    fn display_name(&self, item: ElementRef<'_>) -> String {
        item.select(&self.selectors.name)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }
}
