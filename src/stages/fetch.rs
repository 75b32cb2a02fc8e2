//! Page fetch stage
//!
//! Writes exactly one terminal status per admitted record: `skipped` without
//! any request when robots.txt disallows it, otherwise `fetched` or `failed`
//! depending on the fetch. A failed fetch is recorded and the shard moves
//! on. Fetched URLs are emitted for the outlink stage.

use crate::crawler::PageFetcher;
use crate::engine::{InputItem, KeyValue, ShardContext, StageHandler};
use crate::state::FetchStatus;
use crate::storage::DocumentStore;
use crate::CrawlError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct FetchExecutor {
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn PageFetcher>,
}

impl FetchExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { store, fetcher }
    }
}

#[async_trait]
impl StageHandler for FetchExecutor {
    async fn map(&self, ctx: &ShardContext, item: InputItem) -> Result<Vec<KeyValue>, CrawlError> {
        let InputItem::Pair(pair) = item else {
            return Ok(Vec::new());
        };
        let url = pair.key.as_str();

        let Some(record) = self.store.get_record(url)? else {
            tracing::debug!("No crawl record for {}, ignoring", url);
            return Ok(Vec::new());
        };

        // Already handled by an earlier attempt of this shard
        match record.status {
            FetchStatus::Fetched => return Ok(vec![KeyValue::new(url, "")]),
            FetchStatus::Failed | FetchStatus::Skipped => return Ok(Vec::new()),
            FetchStatus::Unfetched => {}
        }

        if !pair.as_flag() {
            tracing::debug!("Skipping {} (disallowed by robots.txt)", url);
            self.store.mark_skipped(url)?;
            return Ok(Vec::new());
        }

        match self.fetcher.fetch_page(url).await {
            Ok(content) => {
                self.store.mark_fetched(url, &content)?;
                Ok(vec![KeyValue::new(url, "")])
            }
            Err(e) => {
                tracing::warn!("Fetch failed in shard {}: {}", ctx.shard, e);
                self.store.mark_failed(url, &e.to_string())?;
                Ok(Vec::new())
            }
        }
    }
}
