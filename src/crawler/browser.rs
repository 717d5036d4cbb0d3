//! Headless Chromium renderer
//!
//! One browser, one tab, reused for every page. After navigation the renderer
//! keeps listening to the tab's network events and only returns once no
//! request has been in flight for the configured quiet window.

use crate::archive::ArchiveLayout;
use crate::crawler::renderer::{PageRenderer, RenderedPage};
use crate::url::CanonicalUrl;
use crate::{ArchiveError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::Page;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// A network event reduced to what quiescence tracking needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkActivity {
    Started(String),
    Finished(String),
}

/// Tracks in-flight requests and the time of the last network event
///
/// The page counts as settled once nothing is in flight and `window` has
/// passed since the last event.
#[derive(Debug)]
pub struct NetworkQuiescence {
    in_flight: HashSet<String>,
    last_activity: Instant,
    window: Duration,
}

impl NetworkQuiescence {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            in_flight: HashSet::new(),
            last_activity: now,
            window,
        }
    }

    pub fn observe(&mut self, activity: NetworkActivity, now: Instant) {
        match activity {
            // A redirect re-announces the same request id
            NetworkActivity::Started(id) => {
                self.in_flight.insert(id);
            }
            NetworkActivity::Finished(id) => {
                self.in_flight.remove(&id);
            }
        }
        self.last_activity = now;
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// The instant the page becomes idle if nothing else happens
    pub fn quiet_at(&self) -> Instant {
        self.last_activity + self.window
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        self.in_flight.is_empty() && now >= self.quiet_at()
    }
}

/// Drives a headless Chromium tab
pub struct ChromiumRenderer {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    layout: ArchiveLayout,
    idle_window: Duration,
    timeout: Duration,
}

impl ChromiumRenderer {
    /// Launches a headless browser and opens the tab used for every render
    pub async fn launch(layout: ArchiveLayout, idle_window: Duration, timeout: Duration) -> Result<Self> {
        let config = BrowserConfig::builder()
            .request_timeout(timeout)
            .build()
            .map_err(ArchiveError::Browser)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| ArchiveError::Browser(format!("failed to launch Chromium: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ArchiveError::Browser(format!("failed to open tab: {}", e)))?;

        page.execute(EnableParams::default())
            .await
            .map_err(|e| ArchiveError::Browser(format!("failed to enable network events: {}", e)))?;

        tracing::debug!("Chromium launched (idle window {:?})", idle_window);

        Ok(Self {
            browser,
            page,
            handler,
            layout,
            idle_window,
            timeout,
        })
    }

    /// Merged stream of the tab's request lifecycle events
    async fn network_activity(&self) -> Result<BoxStream<'static, NetworkActivity>> {
        let listen_error = |e: chromiumoxide::error::CdpError| ArchiveError::Browser(e.to_string());

        let started = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(listen_error)?
            .map(|e| NetworkActivity::Started(e.request_id.inner().clone()));
        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(listen_error)?
            .map(|e| NetworkActivity::Finished(e.request_id.inner().clone()));
        let failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(listen_error)?
            .map(|e| NetworkActivity::Finished(e.request_id.inner().clone()));

        Ok(stream::select_all(vec![started.boxed(), finished.boxed(), failed.boxed()]).boxed())
    }

    /// Navigates and waits for network quiescence
    async fn navigate(&self, target: &Url) -> std::result::Result<(), String> {
        let mut activity = self.network_activity().await.map_err(|e| e.to_string())?;

        self.page
            .goto(target.as_str())
            .await
            .map_err(|e| e.to_string())?;

        let mut quiescence = NetworkQuiescence::new(self.idle_window, Instant::now());
        loop {
            if quiescence.is_idle(Instant::now()) {
                return Ok(());
            }

            let next = if quiescence.in_flight() > 0 {
                activity.next().await
            } else {
                tokio::select! {
                    next = activity.next() => next,
                    _ = tokio::time::sleep_until(quiescence.quiet_at()) => continue,
                }
            };

            match next {
                Some(event) => quiescence.observe(event, Instant::now()),
                // Tab went away; nothing more can load
                None => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&mut self, url: &CanonicalUrl, use_local: bool) -> Result<RenderedPage> {
        let target = if use_local {
            self.layout.local_page_url(url)?
        } else {
            url.url().clone()
        };

        let navigation_error = |message: String| ArchiveError::Navigation {
            url: target.to_string(),
            message,
        };

        match tokio::time::timeout(self.timeout, self.navigate(&target)).await {
            Ok(Ok(())) => {}
            Ok(Err(message)) => return Err(navigation_error(message)),
            Err(_) => {
                return Err(navigation_error(format!(
                    "network did not settle within {:?}",
                    self.timeout
                )))
            }
        }

        let html = self
            .page
            .content()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        let base_url = if use_local {
            url.url().clone()
        } else {
            self.page
                .url()
                .await
                .ok()
                .flatten()
                .and_then(|current| Url::parse(&current).ok())
                .unwrap_or_else(|| url.url().clone())
        };

        Ok(RenderedPage { html, base_url })
    }

    async fn close(&mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| ArchiveError::Browser(format!("failed to close Chromium: {}", e)))?;
        let _ = self.browser.wait().await;
        (&mut self.handler).await?;
        Ok(())
    }
}
