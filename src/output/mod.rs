//! Output module for run artifacts and reports
//!
//! This module handles:
//! - Accumulating the path -> URL mapping table, visited log and repository list
//! - Writing those artifacts once the crawl finishes
//! - Printing end-of-run statistics

mod recorder;
pub mod stats;

pub use recorder::{MappingTable, Recorder};
pub use stats::{print_statistics, RunStatistics};
