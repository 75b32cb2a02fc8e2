//! Outlink extraction stage
//!
//! Re-reads each fetched page from the store and grows the frontier with the
//! absolute http(s) links found in its text, one level deeper than the page.

use crate::crawler::extract_outlinks;
use crate::engine::{InputItem, KeyValue, ShardContext, StageHandler};
use crate::storage::DocumentStore;
use crate::url::UrlFilter;
use crate::CrawlError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct OutlinkExtractor {
    store: Arc<dyn DocumentStore>,
    url_filter: UrlFilter,
    /// 0 keeps every link
    max_links_per_page: usize,
}

impl OutlinkExtractor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        url_filter: UrlFilter,
        max_links_per_page: usize,
    ) -> Self {
        Self {
            store,
            url_filter,
            max_links_per_page,
        }
    }
}

#[async_trait]
impl StageHandler for OutlinkExtractor {
    async fn map(&self, _ctx: &ShardContext, item: InputItem) -> Result<Vec<KeyValue>, CrawlError> {
        let InputItem::Line(url) = item else {
            return Ok(Vec::new());
        };

        let Some(record) = self.store.get_record(&url)? else {
            return Ok(Vec::new());
        };
        let Some(text) = self
            .store
            .get_content(&url)?
            .and_then(|content| content.content_text)
        else {
            return Ok(Vec::new());
        };

        let limit = match self.max_links_per_page {
            0 => usize::MAX,
            n => n,
        };
        let links: Vec<String> = extract_outlinks(&text)
            .into_iter()
            .filter(|link| self.url_filter.allows(link))
            .take(limit)
            .collect();

        let depth = record.crawl_depth + 1;
        let mut created = 0;
        for link in &links {
            if self.store.discover(link, &record.url, depth)? {
                created += 1;
            }
        }
        tracing::debug!("{} outlink(s) from {}, {} new", links.len(), url, created);

        Ok(Vec::new())
    }
}
