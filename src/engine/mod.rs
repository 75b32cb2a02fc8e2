//! Stage execution engine
//!
//! Every pipeline stage is a map (optionally map-reduce) job over a
//! partitioned input. The engine owns partitioning, shard scheduling, shard
//! retry and artifact files; stage handlers only see one input item at a time.
//!
//! Artifacts are plain files so a stage's output can be handed, unchanged, to
//! the next stage as its entire input.

mod artifact;
mod handler;
mod local;

pub use artifact::{partition_lines, read_key_values, read_lines, write_artifact};
pub use handler::{HandlerRegistry, StageHandler};
pub use local::{ExecutionEngine, LocalEngine};

use crate::state::FetchStatus;
use crate::storage::CrawlRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifies one of the five pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    ExtractDomains,
    FetchRobots,
    AdmissionFilter,
    FetchPages,
    ExtractOutlinks,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractDomains => "extract-domains",
            Self::FetchRobots => "fetch-robots",
            Self::AdmissionFilter => "admission-filter",
            Self::FetchPages => "fetch-pages",
            Self::ExtractOutlinks => "extract-outlinks",
        }
    }

    /// All stages in pipeline order
    pub fn all() -> [Self; 5] {
        [
            Self::ExtractDomains,
            Self::FetchRobots,
            Self::AdmissionFilter,
            Self::FetchPages,
            Self::ExtractOutlinks,
        ]
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One key/value pair emitted by a stage handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A pair whose value is a boolean flag
    pub fn flag(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, if value { "true" } else { "false" })
    }

    /// Reads the value as a boolean flag (`yes`, `true`, `t` or `1`)
    pub fn as_flag(&self) -> bool {
        matches!(
            self.value.trim().to_lowercase().as_str(),
            "yes" | "true" | "t" | "1"
        )
    }
}

/// How a stage's emitted pairs are written to its artifact files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON lines holding both key and value
    KeyValue,
    /// One key per line; empty keys are not written
    Lines,
    /// Nothing is written; the stage runs for its side effects
    Discard,
}

/// Handle to the artifact files a completed stage produced
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub stage: StageId,
    pub format: OutputFormat,
    pub files: Vec<PathBuf>,
}

/// Where a stage reads its input from
#[derive(Debug, Clone)]
pub enum InputSpec {
    /// Records in the store with the given status, dealt round-robin
    Store { status: FetchStatus },
    /// Lines of an upstream artifact, re-balanced by byte size
    BalancedLines {
        source: StageOutput,
        max_shards: usize,
        max_lines_per_shard: usize,
    },
    /// Key/value pairs of an upstream artifact, one shard per file
    Pairs(StageOutput),
    /// Lines of an upstream artifact, one shard per file
    LineFiles(StageOutput),
}

/// Everything the engine needs to run one stage
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub stage: StageId,
    pub input: InputSpec,
    pub output: OutputFormat,
    pub shard_count: usize,
    /// Group mapped pairs by key and run the handler's reduce per key
    pub reduce: bool,
}

impl StageSpec {
    pub fn map(stage: StageId, input: InputSpec, output: OutputFormat, shard_count: usize) -> Self {
        Self {
            stage,
            input,
            output,
            shard_count,
            reduce: false,
        }
    }

    pub fn map_reduce(
        stage: StageId,
        input: InputSpec,
        output: OutputFormat,
        shard_count: usize,
    ) -> Self {
        Self {
            reduce: true,
            ..Self::map(stage, input, output, shard_count)
        }
    }
}

/// Identity of the shard attempt a handler call belongs to
#[derive(Debug, Clone)]
pub struct ShardContext {
    pub job: String,
    pub stage: StageId,
    pub shard: usize,
    pub attempt: u32,
}

/// One unit of stage input
#[derive(Debug, Clone, PartialEq)]
pub enum InputItem {
    Record(CrawlRecord),
    Line(String),
    Pair(KeyValue),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names_are_unique() {
        let names: std::collections::HashSet<_> =
            StageId::all().iter().map(|s| s.as_str()).collect();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_flag_parsing() {
        assert!(KeyValue::flag("u", true).as_flag());
        assert!(!KeyValue::flag("u", false).as_flag());
        assert!(KeyValue::new("u", "Yes").as_flag());
        assert!(KeyValue::new("u", "t").as_flag());
        assert!(KeyValue::new("u", "1").as_flag());
        assert!(!KeyValue::new("u", "").as_flag());
        assert!(!KeyValue::new("u", "no").as_flag());
    }

    #[test]
    fn test_map_reduce_spec() {
        let spec = StageSpec::map_reduce(
            StageId::ExtractDomains,
            InputSpec::Store {
                status: FetchStatus::Unfetched,
            },
            OutputFormat::Lines,
            4,
        );
        assert!(spec.reduce);
        assert_eq!(spec.shard_count, 4);
    }
}
