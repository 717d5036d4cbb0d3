//! Page rendering
//!
//! A renderer loads one page at a time, either from the live site or from the
//! mirror on disk, and hands back the serialized DOM. Two engines exist:
//! - `ChromiumRenderer` (see `browser.rs`): headless Chromium, scripts run,
//!   waits for network quiescence
//! - `StaticRenderer`: plain HTTP GET or file read, no scripts

use crate::archive::ArchiveLayout;
use crate::config::{CrawlerConfig, RendererKind};
use crate::crawler::browser::ChromiumRenderer;
use crate::crawler::fetcher::{build_http_client, get_success};
use crate::url::{CanonicalUrl, LinkKind};
use crate::{ArchiveError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A loaded page, ready for link extraction and saving
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Serialized DOM
    pub html: String,

    /// URL relative links resolve against
    ///
    /// The document's final URL for live loads; the canonical URL for loads
    /// out of the mirror, so that relative links land back on the course site.
    pub base_url: Url,
}

/// Loads pages for the crawl loop
///
/// Only ever driven from the single crawl loop; implementations need not
/// support concurrent navigation.
#[async_trait]
pub trait PageRenderer: Send {
    /// Loads `url` from the mirror when `use_local`, otherwise from the site
    ///
    /// A failure here is a navigation failure and ends the crawl.
    async fn render(&mut self, url: &CanonicalUrl, use_local: bool) -> Result<RenderedPage>;

    /// Releases engine resources
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Fetches pages with plain HTTP; reads cached pages from disk
pub struct StaticRenderer {
    client: Client,
    layout: ArchiveLayout,
}

impl StaticRenderer {
    pub fn new(client: Client, layout: ArchiveLayout) -> Self {
        Self { client, layout }
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&mut self, url: &CanonicalUrl, use_local: bool) -> Result<RenderedPage> {
        if use_local {
            let path = self.layout.archive_path(url, LinkKind::Page);
            let html = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ArchiveError::Navigation {
                    url: path.display().to_string(),
                    message: e.to_string(),
                })?;
            return Ok(RenderedPage {
                html,
                base_url: url.url().clone(),
            });
        }

        let navigation_error = |message: String| ArchiveError::Navigation {
            url: url.to_string(),
            message,
        };

        let response = get_success(&self.client, url.url().as_str())
            .await
            .map_err(navigation_error)?;
        let base_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        Ok(RenderedPage { html, base_url })
    }
}

/// Builds the configured renderer
pub async fn build_renderer(
    kind: RendererKind,
    config: &CrawlerConfig,
    layout: ArchiveLayout,
) -> Result<Box<dyn PageRenderer>> {
    let timeout = Duration::from_secs(config.navigation_timeout_secs);

    match kind {
        RendererKind::Static => {
            let client = build_http_client(&config.user_agent, timeout)?;
            Ok(Box::new(StaticRenderer::new(client, layout)))
        }
        RendererKind::Chromium => {
            let idle_window = Duration::from_millis(config.network_idle_ms);
            let renderer = ChromiumRenderer::launch(layout, idle_window, timeout).await?;
            Ok(Box::new(renderer))
        }
    }
}
