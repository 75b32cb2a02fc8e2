//! Crawler module for page fetching and pipeline coordination
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching under the fetcher policy
//! - Outlink extraction from fetched page text
//! - Sequencing of the pipeline stages

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{run_pipeline, Pipeline, PipelineSettings, RunReport, StageSummary};
pub use fetcher::{build_http_client, HttpFetcher, PageFetcher};
pub use parser::{extract_hrefs, extract_outlinks, is_absolute_http};
