//! Statistics generation from the document store
//!
//! This module provides functionality for extracting and displaying
//! frontier statistics from the storage layer.

use crate::state::FetchStatus;
use crate::storage::DocumentStore;
use crate::CrawlError;
use std::collections::HashMap;

/// Frontier statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of crawl records
    pub total_records: u64,

    /// Count of records by fetch status
    pub records_by_status: HashMap<FetchStatus, u64>,
}

impl CrawlStatistics {
    pub fn count(&self, status: FetchStatus) -> u64 {
        self.records_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The document store to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(store: &dyn DocumentStore) -> Result<CrawlStatistics, CrawlError> {
    let total_records = store.count_total()?;

    let mut records_by_status = HashMap::new();
    for status in FetchStatus::all_statuses() {
        let count = store.count_by_status(status)?;
        if count > 0 {
            records_by_status.insert(status, count);
        }
    }

    Ok(CrawlStatistics {
        total_records,
        records_by_status,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!();

    println!("Records by Status:");
    for status in FetchStatus::all_statuses() {
        let count = stats.count(status);
        let percentage = if stats.total_records > 0 {
            (count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    let resolved = stats.total_records - stats.count(FetchStatus::Unfetched);
    println!(
        "Resolved: {} / {} records ({} fetched)",
        resolved,
        stats.total_records,
        stats.count(FetchStatus::Fetched)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[test]
    fn test_load_statistics() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/1").unwrap();
        store.insert_seed("http://a.example/2").unwrap();
        store.insert_seed("http://a.example/3").unwrap();
        store.mark_failed("http://a.example/3", "timeout").unwrap();

        let stats = load_statistics(&store).unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.count(FetchStatus::Unfetched), 2);
        assert_eq!(stats.count(FetchStatus::Failed), 1);
        assert_eq!(stats.count(FetchStatus::Fetched), 0);
        assert!(!stats.records_by_status.contains_key(&FetchStatus::Skipped));
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stats = load_statistics(&store).unwrap();
        assert_eq!(stats.total_records, 0);
        assert!(stats.records_by_status.is_empty());
    }
}
