//! Crawler coordinator - pipeline orchestration
//!
//! This module sequences the five stages of one crawl pass:
//! - domain extraction, robots.txt fetch, admission filter, page fetch
//! - outlink extraction, run for its frontier side effects only
//!
//! Each transition of [`PipelineState`] waits for every shard of the current
//! stage and hands its output to the next stage. Artifact cleanup runs as
//! detached tasks that can never fail the run.

use crate::config::{JobConfig, Policies};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::engine::{
    ExecutionEngine, InputSpec, LocalEngine, OutputFormat, StageId, StageOutput, StageSpec,
};
use crate::state::FetchStatus;
use crate::storage::{open_store, DocumentStore};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Sharding parameters of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub shard_count: usize,
    pub robots_max_shards: usize,
    pub robots_max_domains_per_shard: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &JobConfig) -> Self {
        Self {
            shard_count: config.job.shard_count,
            robots_max_shards: config.robots.max_shard_count,
            robots_max_domains_per_shard: config.robots.max_domains_per_shard,
        }
    }
}

/// Where a run currently is; each variant carries the outputs the next stage needs
#[derive(Debug)]
enum PipelineState {
    ExtractDomains,
    FetchRobots {
        domains: StageOutput,
    },
    AdmissionFilter {
        domains: StageOutput,
        robots: StageOutput,
    },
    FetchPages {
        upstream: Vec<StageOutput>,
        admission: StageOutput,
    },
    ExtractOutlinks {
        fetched: StageOutput,
    },
    Done,
}

/// Shard count of one completed stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: StageId,
    pub files: usize,
}

/// Outcome of one pipeline run
#[derive(Debug, Default)]
pub struct RunReport {
    pub stages: Vec<StageSummary>,
    /// Set when the outlink stage failed; the run itself still succeeds
    pub outlink_error: Option<String>,
    cleanup: Vec<JoinHandle<()>>,
}

impl RunReport {
    pub fn outlinks_succeeded(&self) -> bool {
        self.outlink_error.is_none()
    }

    /// Waits for the detached artifact cleanup tasks
    pub async fn wait_for_cleanup(&mut self) {
        for handle in self.cleanup.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!("Cleanup task failed: {}", e);
            }
        }
    }
}

/// Runs the five stages as a strict sequence over an execution engine
pub struct Pipeline {
    engine: Arc<dyn ExecutionEngine>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(engine: Arc<dyn ExecutionEngine>, settings: PipelineSettings) -> Self {
        Self { engine, settings }
    }

    /// Runs one full crawl pass
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Every stage up to the page fetch completed
    /// * `Err(CrawlError)` - A stage up to the page fetch failed
    pub async fn run(&self) -> Result<RunReport, CrawlError> {
        let mut report = RunReport::default();
        let mut state = PipelineState::ExtractDomains;

        loop {
            state = match state {
                PipelineState::ExtractDomains => {
                    let domains = self
                        .run_stage(
                            &mut report,
                            StageSpec::map_reduce(
                                StageId::ExtractDomains,
                                InputSpec::Store {
                                    status: FetchStatus::Unfetched,
                                },
                                OutputFormat::Lines,
                                self.settings.shard_count,
                            ),
                        )
                        .await?;
                    PipelineState::FetchRobots { domains }
                }

                PipelineState::FetchRobots { domains } => {
                    let robots = self
                        .run_stage(
                            &mut report,
                            StageSpec::map(
                                StageId::FetchRobots,
                                InputSpec::BalancedLines {
                                    source: domains.clone(),
                                    max_shards: self.settings.robots_max_shards,
                                    max_lines_per_shard: self.settings.robots_max_domains_per_shard,
                                },
                                OutputFormat::KeyValue,
                                self.settings.shard_count,
                            ),
                        )
                        .await?;
                    PipelineState::AdmissionFilter { domains, robots }
                }

                PipelineState::AdmissionFilter { domains, robots } => {
                    let admission = self
                        .run_stage(
                            &mut report,
                            StageSpec::map(
                                StageId::AdmissionFilter,
                                InputSpec::Pairs(robots.clone()),
                                OutputFormat::KeyValue,
                                self.settings.shard_count,
                            ),
                        )
                        .await?;
                    PipelineState::FetchPages {
                        upstream: vec![domains, robots],
                        admission,
                    }
                }

                PipelineState::FetchPages {
                    mut upstream,
                    admission,
                } => {
                    let fetched = self
                        .run_stage(
                            &mut report,
                            StageSpec::map(
                                StageId::FetchPages,
                                InputSpec::Pairs(admission.clone()),
                                OutputFormat::Lines,
                                self.settings.shard_count,
                            ),
                        )
                        .await?;

                    upstream.push(admission);
                    report.cleanup.push(self.spawn_cleanup(upstream));
                    PipelineState::ExtractOutlinks { fetched }
                }

                PipelineState::ExtractOutlinks { fetched } => {
                    let result = self
                        .run_stage(
                            &mut report,
                            StageSpec::map(
                                StageId::ExtractOutlinks,
                                InputSpec::LineFiles(fetched.clone()),
                                OutputFormat::Discard,
                                self.settings.shard_count,
                            ),
                        )
                        .await;
                    if let Err(e) = result {
                        tracing::warn!("Outlink extraction failed: {}", e);
                        report.outlink_error = Some(e.to_string());
                    }

                    report.cleanup.push(self.spawn_cleanup(vec![fetched]));
                    PipelineState::Done
                }

                PipelineState::Done => break,
            };
        }

        tracing::info!("Pipeline run complete");
        Ok(report)
    }

    async fn run_stage(
        &self,
        report: &mut RunReport,
        spec: StageSpec,
    ) -> Result<StageOutput, CrawlError> {
        let output = self.engine.run_stage(spec).await?;
        report.stages.push(StageSummary {
            stage: output.stage,
            files: output.files.len(),
        });
        Ok(output)
    }

    fn spawn_cleanup(&self, outputs: Vec<StageOutput>) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move { engine.cleanup(outputs).await })
    }
}

/// Opens the store, builds the fetcher and engine, and runs one pipeline pass
///
/// Relative paths in `config` are resolved against `base_dir`.
pub async fn run_pipeline(
    config: &JobConfig,
    policies: &Policies,
    base_dir: &Path,
) -> Result<RunReport, CrawlError> {
    let store: Arc<dyn DocumentStore> =
        Arc::new(open_store(&base_dir.join(&config.storage.database_path))?);
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(policies.fetcher.clone())?);

    let pending = store.count_by_status(FetchStatus::Unfetched)?;
    tracing::info!(
        "Starting job {} with {} pending record(s)",
        config.job.name,
        pending
    );

    let registry = crate::stages::build_registry(Arc::clone(&store), fetcher, policies);
    let engine = LocalEngine::new(
        config.job.name.clone(),
        base_dir.join(&config.job.work_dir),
        store,
        Arc::new(registry),
        config.job.max_shard_attempts,
    );

    Pipeline::new(Arc::new(engine), PipelineSettings::from_config(config))
        .run()
        .await
}
