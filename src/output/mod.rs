//! Output module for run reports and frontier statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::crawler::RunReport;

/// Prints a finished run's report to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Pipeline Run ===\n");
    for summary in &report.stages {
        println!("  {}: {} artifact file(s)", summary.stage, summary.files);
    }
    println!();

    match &report.outlink_error {
        Some(error) => println!("Outlink extraction failed: {}", error),
        None => println!("Outlink extraction completed"),
    }
}
