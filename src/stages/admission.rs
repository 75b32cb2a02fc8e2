//! Admission filter stage
//!
//! Turns each domain's robots.txt body into a fetch-allowed flag for every
//! pending record of that domain. The records are read from the store when
//! the domain is processed, so records tagged after the robots fetch are
//! still covered.

use crate::engine::{InputItem, KeyValue, ShardContext, StageHandler};
use crate::robots::RobotsPolicy;
use crate::storage::DocumentStore;
use crate::CrawlError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct AdmissionFilter {
    store: Arc<dyn DocumentStore>,
    agent_name: String,
}

impl AdmissionFilter {
    pub fn new(store: Arc<dyn DocumentStore>, agent_name: impl Into<String>) -> Self {
        Self {
            store,
            agent_name: agent_name.into(),
        }
    }
}

#[async_trait]
impl StageHandler for AdmissionFilter {
    async fn map(&self, _ctx: &ShardContext, item: InputItem) -> Result<Vec<KeyValue>, CrawlError> {
        let InputItem::Pair(KeyValue { key: domain, value: body }) = item else {
            return Ok(Vec::new());
        };

        let policy = RobotsPolicy::from_body(body);
        let records = self.store.pending_records_for_domain(&domain)?;
        if records.is_empty() {
            tracing::debug!("No pending records for {}", domain);
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let allowed = policy.can_fetch(&self.agent_name, &record.url);
                tracing::debug!("{} -> {}", record.url, if allowed { "allowed" } else { "disallowed" });
                KeyValue::flag(record.url, allowed)
            })
            .collect())
    }
}
