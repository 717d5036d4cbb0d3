//! Crawler module: the crawl loop and everything it drives
//!
//! This module contains the core archiving logic, including:
//! - The LIFO frontier and visited set
//! - Page rendering (headless Chromium or plain HTTP)
//! - Link extraction and classification
//! - The bounded background download queue
//! - Overall crawl coordination

mod browser;
mod coordinator;
mod downloader;
mod fetcher;
mod frontier;
mod links;
mod renderer;

pub use browser::{ChromiumRenderer, NetworkActivity, NetworkQuiescence};
pub use coordinator::{run_archive, Crawler, RunOutcome};
pub use downloader::{CompletedDownload, DownloadOutcome, DownloadQueue};
pub use fetcher::{build_http_client, get_success};
pub use frontier::{Frontier, Offer};
pub use links::{extract_anchor_urls, extract_links, DiscoveredLink};
pub use renderer::{build_renderer, PageRenderer, RenderedPage, StaticRenderer};
