//! In-process execution engine
//!
//! Runs every shard of a stage as a tokio task and retries failing shards.
//! A stage returns only when all of its shards have finished, which is the
//! barrier between consecutive stages.

use crate::engine::artifact::{partition_lines, read_key_values, read_lines, write_artifact};
use crate::engine::{
    HandlerRegistry, InputItem, InputSpec, KeyValue, OutputFormat, ShardContext, StageHandler,
    StageId, StageOutput, StageSpec,
};
use crate::storage::DocumentStore;
use crate::CrawlError;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Runs stages and disposes of their artifacts
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Runs every shard of a stage to completion
    ///
    /// Fails with [`CrawlError::StageFailed`] when any shard exhausts its
    /// attempts.
    async fn run_stage(&self, spec: StageSpec) -> Result<StageOutput, CrawlError>;

    /// Deletes stage artifacts; failures are logged and swallowed
    async fn cleanup(&self, outputs: Vec<StageOutput>);
}

/// Execution engine running shards as tasks of the current tokio runtime
pub struct LocalEngine {
    job: String,
    work_dir: PathBuf,
    store: Arc<dyn DocumentStore>,
    registry: Arc<HandlerRegistry>,
    max_shard_attempts: u32,
}

/// What a finished shard hands back to the stage
struct ShardResult {
    shard: usize,
    outcome: Result<Vec<KeyValue>, CrawlError>,
}

impl LocalEngine {
    pub fn new(
        job: impl Into<String>,
        work_dir: impl Into<PathBuf>,
        store: Arc<dyn DocumentStore>,
        registry: Arc<HandlerRegistry>,
        max_shard_attempts: u32,
    ) -> Self {
        Self {
            job: job.into(),
            work_dir: work_dir.into(),
            store,
            registry,
            max_shard_attempts: max_shard_attempts.max(1),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    fn stage_dir(&self, stage: StageId) -> PathBuf {
        self.work_dir.join(&self.job).join(stage.as_str())
    }

    /// Splits the stage input into shards of items
    fn partition(
        &self,
        input: &InputSpec,
        shard_count: usize,
    ) -> Result<Vec<Vec<InputItem>>, CrawlError> {
        match input {
            InputSpec::Store { status } => {
                let records = self.store.records_by_status(*status)?;
                let count = shard_count.max(1);
                let mut shards: Vec<Vec<InputItem>> = vec![Vec::new(); count];
                for (i, record) in records.into_iter().enumerate() {
                    shards[i % count].push(InputItem::Record(record));
                }
                Ok(shards)
            }
            InputSpec::BalancedLines {
                source,
                max_shards,
                max_lines_per_shard,
            } => {
                let shards =
                    partition_lines(&source.files, shard_count, *max_shards, *max_lines_per_shard)?;
                Ok(shards
                    .into_iter()
                    .map(|lines| lines.into_iter().map(InputItem::Line).collect())
                    .collect())
            }
            InputSpec::Pairs(source) => source
                .files
                .iter()
                .map(|path| -> Result<Vec<InputItem>, CrawlError> {
                    Ok(read_key_values(path)?
                        .into_iter()
                        .map(InputItem::Pair)
                        .collect())
                })
                .collect(),
            InputSpec::LineFiles(source) => source
                .files
                .iter()
                .map(|path| -> Result<Vec<InputItem>, CrawlError> {
                    Ok(read_lines(path)?
                        .into_iter()
                        .map(InputItem::Line)
                        .collect())
                })
                .collect(),
        }
    }
}

/// Runs one shard, retrying it wholesale until it succeeds or runs out of attempts
async fn run_shard(
    handler: Arc<dyn StageHandler>,
    job: String,
    stage: StageId,
    shard: usize,
    items: Vec<InputItem>,
    max_attempts: u32,
    output: Option<(PathBuf, OutputFormat)>,
) -> Result<Vec<KeyValue>, CrawlError> {
    let mut attempt = 1;
    loop {
        let ctx = ShardContext {
            job: job.clone(),
            stage,
            shard,
            attempt,
        };
        let span = tracing::info_span!("shard", job = %job, stage = %stage, shard, attempt);

        let result = async {
            let mut pairs = Vec::new();
            for item in items.iter().cloned() {
                pairs.extend(handler.map(&ctx, item).await?);
            }
            if let Some((path, format)) = &output {
                write_artifact(path, *format, &pairs)?;
            }
            Ok::<_, CrawlError>(pairs)
        }
        .instrument(span)
        .await;

        match result {
            Ok(pairs) => return Ok(pairs),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    "Shard {} of {} failed, retrying ({}/{}): {}",
                    shard,
                    stage,
                    attempt,
                    max_attempts,
                    e
                );
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    "Shard {} of {} failed after {} attempt(s): {}",
                    shard,
                    stage,
                    attempt,
                    e
                );
                return Err(CrawlError::ShardFailed {
                    stage,
                    shard,
                    attempts: attempt,
                    message: e.to_string(),
                });
            }
        }
    }
}

fn shard_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{}-{:04}.out", prefix, index))
}

fn partition_of(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

#[async_trait]
impl ExecutionEngine for LocalEngine {
    async fn run_stage(&self, spec: StageSpec) -> Result<StageOutput, CrawlError> {
        let handler = self.registry.get(spec.stage)?;
        let shards = self.partition(&spec.input, spec.shard_count)?;
        let total = shards.len();

        let dir = self.stage_dir(spec.stage);
        if spec.output != OutputFormat::Discard {
            tokio::fs::create_dir_all(&dir).await?;
        }

        tracing::info!("Starting stage {} with {} shard(s)", spec.stage, total);

        let mut tasks = JoinSet::new();
        for (index, items) in shards.into_iter().enumerate() {
            // Map-reduce shards hand their pairs back instead of writing them
            let output = (!spec.reduce && spec.output != OutputFormat::Discard)
                .then(|| (shard_path(&dir, "shard", index), spec.output));
            let handler = Arc::clone(&handler);
            let job = self.job.clone();
            let stage = spec.stage;
            let max_attempts = self.max_shard_attempts;

            tasks.spawn(async move {
                let outcome =
                    run_shard(handler, job, stage, index, items, max_attempts, output).await;
                ShardResult {
                    shard: index,
                    outcome,
                }
            });
        }

        let mut failed = 0;
        let mut finished: BTreeMap<usize, Vec<KeyValue>> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(ShardResult {
                    shard,
                    outcome: Ok(pairs),
                }) => {
                    finished.insert(shard, pairs);
                }
                Ok(ShardResult {
                    outcome: Err(_), ..
                }) => failed += 1,
                Err(e) => {
                    tracing::error!("Shard task of {} panicked: {}", spec.stage, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(CrawlError::StageFailed {
                stage: spec.stage,
                failed,
                total,
            });
        }

        let files = if spec.output == OutputFormat::Discard {
            Vec::new()
        } else if spec.reduce {
            let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for pair in finished.into_values().flatten() {
                grouped.entry(pair.key).or_default().push(pair.value);
            }

            let partitions = spec.shard_count.max(1);
            let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); partitions];
            for (key, values) in &grouped {
                if let Some(reduced) = handler.reduce(key, values) {
                    buckets[partition_of(&reduced.key, partitions)].push(reduced);
                }
            }

            let mut files = Vec::with_capacity(partitions);
            for (index, bucket) in buckets.iter().enumerate() {
                let path = shard_path(&dir, "part", index);
                write_artifact(&path, spec.output, bucket)?;
                files.push(path);
            }
            files
        } else {
            finished
                .keys()
                .map(|index| shard_path(&dir, "shard", *index))
                .collect()
        };

        tracing::info!("Stage {} completed: {} shard(s)", spec.stage, total);

        Ok(StageOutput {
            stage: spec.stage,
            format: spec.output,
            files,
        })
    }

    async fn cleanup(&self, outputs: Vec<StageOutput>) {
        for output in outputs {
            for file in &output.files {
                match tokio::fs::remove_file(file).await {
                    Ok(()) => tracing::debug!("Removed artifact {}", file.display()),
                    Err(e) => tracing::warn!("Failed to remove artifact {}: {}", file.display(), e),
                }
            }
            // Only succeeds once the directory is empty
            let _ = tokio::fs::remove_dir(self.stage_dir(output.stage)).await;
        }
    }
}
