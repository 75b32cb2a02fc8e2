use crate::engine::{InputItem, KeyValue, ShardContext, StageId};
use crate::CrawlError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-item logic of one stage
///
/// `map` may be called more than once for the same item when a shard is
/// retried, so its side effects must be idempotent. An error fails the
/// whole shard.
#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn map(&self, ctx: &ShardContext, item: InputItem) -> Result<Vec<KeyValue>, CrawlError>;

    /// Folds every value mapped under one key; `None` drops the key
    fn reduce(&self, _key: &str, _values: &[String]) -> Option<KeyValue> {
        None
    }
}

/// Maps stage identifiers to their handlers
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<StageId, Arc<dyn StageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any earlier one for the stage
    pub fn register(&mut self, stage: StageId, handler: Arc<dyn StageHandler>) {
        self.handlers.insert(stage, handler);
    }

    pub fn get(&self, stage: StageId) -> Result<Arc<dyn StageHandler>, CrawlError> {
        self.handlers
            .get(&stage)
            .cloned()
            .ok_or(CrawlError::UnregisteredStage(stage))
    }

    pub fn contains(&self, stage: StageId) -> bool {
        self.handlers.contains_key(&stage)
    }
}
