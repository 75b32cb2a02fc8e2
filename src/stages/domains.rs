//! Domain extraction stage
//!
//! Tags every pending record with its domain key and reduces the emitted keys
//! to the distinct set of domains that need a robots.txt fetch.

use crate::engine::{InputItem, KeyValue, ShardContext, StageHandler};
use crate::state::FetchStatus;
use crate::storage::DocumentStore;
use crate::url::extract_domain;
use crate::CrawlError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct DomainExtractor {
    store: Arc<dyn DocumentStore>,
}

impl DomainExtractor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StageHandler for DomainExtractor {
    async fn map(&self, _ctx: &ShardContext, item: InputItem) -> Result<Vec<KeyValue>, CrawlError> {
        let InputItem::Record(record) = item else {
            return Ok(Vec::new());
        };
        if record.status != FetchStatus::Unfetched {
            return Ok(Vec::new());
        }

        let domain = extract_domain(&record.url);
        if domain.is_empty() {
            tracing::debug!("No domain for {}", record.url);
            return Ok(vec![KeyValue::new(domain, "")]);
        }

        // The store re-checks the status, so a re-run never re-tags
        if self.store.tag_domain(&record.url, &domain)? {
            Ok(vec![KeyValue::new(domain, "")])
        } else {
            Ok(Vec::new())
        }
    }

    fn reduce(&self, key: &str, _values: &[String]) -> Option<KeyValue> {
        (!key.is_empty()).then(|| KeyValue::new(key, ""))
    }
}
