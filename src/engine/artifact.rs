//! Stage artifact files
//!
//! A shard writes its whole output at once, to a temporary file renamed into
//! place, so a retried shard replaces its earlier output instead of appending.

use crate::engine::{KeyValue, OutputFormat};
use crate::CrawlError;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Writes one shard's pairs to `path` in the given format
pub fn write_artifact(
    path: &Path,
    format: OutputFormat,
    pairs: &[KeyValue],
) -> Result<(), CrawlError> {
    if format == OutputFormat::Discard {
        return Ok(());
    }

    let tmp = path.with_extension("tmp");
    {
        let file = fs::File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        for pair in pairs {
            match format {
                OutputFormat::KeyValue => {
                    serde_json::to_writer(&mut writer, pair)?;
                    writer.write_all(b"\n")?;
                }
                OutputFormat::Lines => {
                    if pair.key.is_empty() {
                        continue;
                    }
                    writer.write_all(pair.key.as_bytes())?;
                    writer.write_all(b"\n")?;
                }
                OutputFormat::Discard => {}
            }
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_artifact(path: &Path) -> Result<String, CrawlError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CrawlError::MissingArtifact(path.display().to_string()),
        _ => CrawlError::Io(e),
    })
}

/// Reads a key/value artifact
pub fn read_key_values(path: &Path) -> Result<Vec<KeyValue>, CrawlError> {
    let content = read_artifact(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(CrawlError::from))
        .collect()
}

/// Reads the non-blank lines of a line artifact
pub fn read_lines(path: &Path) -> Result<Vec<String>, CrawlError> {
    let content = read_artifact(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Splits line artifacts into shards balanced by byte size
///
/// The shard budget is `min(requested, max_shards)`, divided evenly between
/// the files (at least one shard per file). Within a file, a line belongs to
/// the byte range it starts in. Shards holding more than `max_lines_per_shard`
/// lines are split further; empty shards are dropped.
pub fn partition_lines(
    files: &[PathBuf],
    requested: usize,
    max_shards: usize,
    max_lines_per_shard: usize,
) -> Result<Vec<Vec<String>>, CrawlError> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let shard_count = requested.min(max_shards).max(1);
    let shards_per_file = (shard_count / files.len()).max(1);
    let max_lines = max_lines_per_shard.max(1);

    let mut shards = Vec::new();
    for path in files {
        let content = read_artifact(path)?;
        let chunk_size = (content.len() / shards_per_file).max(1);

        let mut chunks: Vec<Vec<String>> = vec![Vec::new(); shards_per_file];
        let mut offset = 0usize;
        for line in content.split_inclusive('\n') {
            let index = (offset / chunk_size).min(shards_per_file - 1);
            offset += line.len();

            let line = line.trim();
            if !line.is_empty() {
                chunks[index].push(line.to_string());
            }
        }

        for chunk in chunks {
            for part in chunk.chunks(max_lines) {
                shards.push(part.to_vec());
            }
        }
    }

    Ok(shards)
}
