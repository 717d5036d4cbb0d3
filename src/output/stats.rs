//! End-of-run statistics

use std::time::Duration;

/// Counters accumulated over one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Pages loaded from the live site
    pub pages_remote: u64,

    /// Pages loaded from the local mirror
    pub pages_local: u64,

    /// Files fetched over the network
    pub files_downloaded: u64,

    /// Files already present on disk
    pub files_cached: u64,

    /// Files whose download failed
    pub files_failed: u64,

    /// Distinct repository references
    pub repositories: u64,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl RunStatistics {
    pub fn pages_total(&self) -> u64 {
        self.pages_remote + self.pages_local
    }

    pub fn files_total(&self) -> u64 {
        self.files_downloaded + self.files_cached + self.files_failed
    }

    /// Returns true if nothing was fetched from the network
    pub fn is_fully_cached(&self) -> bool {
        self.pages_remote == 0 && self.files_downloaded == 0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Pages:");
    println!("  Rendered: {}", stats.pages_total());
    println!("    remote: {}", stats.pages_remote);
    println!("    local:  {}", stats.pages_local);
    println!();

    println!("Files:");
    println!("  Seen: {}", stats.files_total());
    println!("    downloaded: {}", stats.files_downloaded);
    println!("    cached:     {}", stats.files_cached);
    println!("    failed:     {}", stats.files_failed);
    println!();

    println!("Repositories referenced: {}", stats.repositories);
    println!("Elapsed: {:.2}s", stats.elapsed.as_secs_f64());
}
