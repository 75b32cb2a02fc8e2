//! Pipeline stage handlers
//!
//! One handler per stage, in pipeline order:
//! - [`DomainExtractor`]: tags pending records with their domain key
//! - [`RobotsFetcher`]: fetches one robots.txt per distinct domain
//! - [`AdmissionFilter`]: decides fetch-allowed per pending record
//! - [`FetchExecutor`]: fetches pages and writes terminal statuses
//! - [`OutlinkExtractor`]: grows the frontier from fetched pages

mod admission;
mod domains;
mod fetch;
mod outlinks;
mod robots_fetch;

pub use admission::AdmissionFilter;
pub use domains::DomainExtractor;
pub use fetch::FetchExecutor;
pub use outlinks::OutlinkExtractor;
pub use robots_fetch::RobotsFetcher;

use crate::config::Policies;
use crate::crawler::PageFetcher;
use crate::engine::{HandlerRegistry, StageId};
use crate::storage::DocumentStore;
use std::sync::Arc;

/// Builds the registry holding the handler of every pipeline stage
pub fn build_registry(
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn PageFetcher>,
    policies: &Policies,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(
        StageId::ExtractDomains,
        Arc::new(DomainExtractor::new(Arc::clone(&store))),
    );
    registry.register(
        StageId::FetchRobots,
        Arc::new(RobotsFetcher::new(Arc::clone(&fetcher))),
    );
    registry.register(
        StageId::AdmissionFilter,
        Arc::new(AdmissionFilter::new(
            Arc::clone(&store),
            policies.fetcher.agent_name.clone(),
        )),
    );
    registry.register(
        StageId::FetchPages,
        Arc::new(FetchExecutor::new(Arc::clone(&store), fetcher)),
    );
    registry.register(
        StageId::ExtractOutlinks,
        Arc::new(OutlinkExtractor::new(
            store,
            policies.url_filter.clone(),
            policies.fetcher.max_links_per_page as usize,
        )),
    );
    registry
}
