//! Per-record crawl state
//!
//! `FetchStatus` is the only mutable lifecycle field of a crawl record.

mod fetch_status;

pub use fetch_status::FetchStatus;
