//! Mirror layout on disk
//!
//! - `ArchiveLayout`: canonical URL -> path under the output directory
//! - `CacheProber`: existence checks against that layout

mod cache;
mod path;

pub use cache::CacheProber;
pub use path::ArchiveLayout;
