//! Robots.txt fetch stage
//!
//! One fetch per domain, no retry inside the stage: a failed fetch fails the
//! shard and the engine re-runs it, so a domain may be emitted more than once.

use crate::crawler::PageFetcher;
use crate::engine::{InputItem, KeyValue, ShardContext, StageHandler};
use crate::robots::body_or_permissive;
use crate::CrawlError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct RobotsFetcher {
    fetcher: Arc<dyn PageFetcher>,
}

impl RobotsFetcher {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl StageHandler for RobotsFetcher {
    async fn map(&self, _ctx: &ShardContext, item: InputItem) -> Result<Vec<KeyValue>, CrawlError> {
        let InputItem::Line(domain) = item else {
            return Ok(Vec::new());
        };

        let body = body_or_permissive(self.fetcher.fetch_robots(&domain).await)?;
        tracing::debug!("robots.txt for {}: {} bytes", domain, body.len());
        Ok(vec![KeyValue::new(domain, body)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StageId;
    use crate::storage::FetchedContent;
    use crate::{FetchError, FetchResult};
    use std::sync::Mutex;

    /// Serves canned robots answers and records requested domains
    struct CannedFetcher {
        status: Option<u16>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        async fn fetch_page(&self, url: &str) -> FetchResult<FetchedContent> {
            Err(FetchError::InvalidUrl(url.to_string()))
        }

        async fn fetch_robots(&self, domain: &str) -> FetchResult<String> {
            self.requested.lock().unwrap().push(domain.to_string());
            match self.status {
                None => Ok("User-agent: *\nDisallow: /private".to_string()),
                Some(status) => Err(FetchError::HttpStatus {
                    url: format!("{}/robots.txt", domain),
                    status,
                }),
            }
        }
    }

    fn ctx() -> ShardContext {
        ShardContext {
            job: "test".to_string(),
            stage: StageId::FetchRobots,
            shard: 0,
            attempt: 1,
        }
    }

    fn handler(status: Option<u16>) -> (Arc<CannedFetcher>, RobotsFetcher) {
        let fetcher = Arc::new(CannedFetcher {
            status,
            requested: Mutex::new(Vec::new()),
        });
        (fetcher.clone(), RobotsFetcher::new(fetcher))
    }

    #[tokio::test]
    async fn test_emits_domain_and_body() {
        let (fetcher, handler) = handler(None);
        let out = handler
            .map(&ctx(), InputItem::Line("http://a.example".to_string()))
            .await
            .unwrap();

        assert_eq!(
            out,
            vec![KeyValue::new(
                "http://a.example",
                "User-agent: *\nDisallow: /private"
            )]
        );
        assert_eq!(*fetcher.requested.lock().unwrap(), vec!["http://a.example"]);
    }

    #[tokio::test]
    async fn test_missing_robots_is_empty_body() {
        let (_fetcher, handler) = handler(Some(404));
        let out = handler
            .map(&ctx(), InputItem::Line("http://a.example".to_string()))
            .await
            .unwrap();
        assert_eq!(out, vec![KeyValue::new("http://a.example", "")]);
    }

    #[tokio::test]
    async fn test_server_error_fails_shard() {
        let (_fetcher, handler) = handler(Some(503));
        let result = handler
            .map(&ctx(), InputItem::Line("http://a.example".to_string()))
            .await;
        assert!(matches!(result, Err(CrawlError::Fetch(_))));
    }
}
