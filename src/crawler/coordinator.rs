//! Crawl coordinator - the single-threaded crawl loop
//!
//! `Crawler` owns every piece of session state (frontier, recorder, download
//! queue, renderer) so independent crawls can run side by side in one
//! process. The loop:
//! 1. Pops the next URL and marks it visited
//! 2. Asks the cache prober whether the mirror already holds it
//! 3. Renders it, locally or remotely
//! 4. Feeds outgoing links to the frontier, the download queue and the
//!    repository set
//! 5. Claims the page's archive path, then saves it (remote loads only)
//!
//! Archive paths are claimed in the mapping table before any bytes are
//! written, for pages and downloads alike; a failed download gives its claim
//! back.
//!
//! When the frontier runs dry, outstanding downloads are joined and the
//! artifacts flushed. A fatal error takes the same exit path before it is
//! returned, so whatever was archived so far stays recorded.

use crate::archive::{ArchiveLayout, CacheProber};
use crate::config::{Config, OutputConfig};
use crate::crawler::downloader::{CompletedDownload, DownloadOutcome, DownloadQueue};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::{Frontier, Offer};
use crate::crawler::links::{annotate_base, extract_links, DiscoveredLink};
use crate::crawler::renderer::{build_renderer, PageRenderer, RenderedPage};
use crate::output::{Recorder, RunStatistics};
use crate::url::{canonicalize, CanonicalUrl, LinkKind, SiteScope};
use crate::Result;
use std::time::{Duration, Instant};

/// Result of a completed crawl
#[derive(Debug)]
pub struct RunOutcome {
    pub stats: RunStatistics,

    /// Everything that was written to the artifacts
    pub recorder: Recorder,
}

/// One archiving session
pub struct Crawler {
    output: OutputConfig,
    use_cache: bool,
    scope: SiteScope,
    layout: ArchiveLayout,
    prober: CacheProber,
    frontier: Frontier,
    recorder: Recorder,
    downloads: DownloadQueue,
    renderer: Box<dyn PageRenderer>,
    stats: RunStatistics,
}

impl Crawler {
    /// Creates a crawler seeded with the course base URL
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `renderer` - Engine used to load pages
    pub fn new(config: &Config, renderer: Box<dyn PageRenderer>) -> Result<Self> {
        let scope = SiteScope::from_config(&config.site)?;
        let layout = ArchiveLayout::new(&config.output.out_dir);
        let prober = CacheProber::new(layout.clone());

        let client = build_http_client(
            &config.crawler.user_agent,
            Duration::from_secs(config.crawler.navigation_timeout_secs),
        )?;
        let downloads = DownloadQueue::new(
            client,
            prober.clone(),
            config.crawler.use_cache,
            config.crawler.max_concurrent_downloads,
        );

        let mut frontier = Frontier::new();
        frontier.seed(canonicalize(scope.course(), false, scope.course())?);

        Ok(Self {
            output: config.output.clone(),
            use_cache: config.crawler.use_cache,
            scope,
            layout,
            prober,
            frontier,
            recorder: Recorder::new(),
            downloads,
            renderer,
            stats: RunStatistics::default(),
        })
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(RunOutcome)` - Frontier exhausted, downloads joined, artifacts written
    /// * `Err(ArchiveError)` - A fatal error; partial artifacts were still written
    pub async fn run(mut self) -> Result<RunOutcome> {
        let start_time = Instant::now();
        tracing::info!(
            "Archiving {} into {} (cache {})",
            self.scope.course(),
            self.layout.out_dir().display(),
            if self.use_cache { "on" } else { "off" }
        );

        let crawled = self.crawl().await;
        if let Err(e) = &crawled {
            tracing::error!("Crawl halted: {}", e);
        }

        let pending = self.downloads.pending();
        if pending > 0 {
            tracing::info!("Waiting for {} outstanding downloads", pending);
        }
        let downloaded = self.finish_downloads().await;

        if let Err(e) = self.renderer.close().await {
            tracing::warn!("Failed to shut down renderer: {}", e);
        }

        self.stats.repositories = self.recorder.repositories().len() as u64;
        self.stats.elapsed = start_time.elapsed();

        let flushed = self.recorder.flush(&self.output);
        crawled.and(downloaded).and(flushed)?;

        tracing::info!(
            "Crawl completed: {} pages, {} files in {:?}",
            self.stats.pages_total(),
            self.stats.files_total(),
            self.stats.elapsed
        );

        Ok(RunOutcome {
            stats: self.stats,
            recorder: self.recorder,
        })
    }

    async fn crawl(&mut self) -> Result<()> {
        while let Some(url) = self.frontier.pop() {
            // Pushed twice before the first copy was visited
            if !self.frontier.mark_visited_and_proceed(&url) {
                continue;
            }

            self.visit(url).await?;

            while let Some(done) = self.downloads.try_next() {
                self.collect_download(done)?;
            }
        }

        tracing::info!("Frontier is empty");
        Ok(())
    }

    async fn visit(&mut self, url: CanonicalUrl) -> Result<()> {
        self.recorder.record_visited(url.as_str());

        let use_local = self.use_cache && self.prober.has_cached_copy(&url).await;
        tracing::info!(
            "{} {} {} -- {}",
            self.frontier.visited_count(),
            self.frontier.len(),
            url,
            if use_local { "local" } else { "remote" }
        );

        let page = self.renderer.render(&url, use_local).await?;
        let links = extract_links(&page.html, &page.base_url, &self.scope, use_local);
        self.follow_links(links)?;

        // A key is claimed before anything is written under it
        let key = self.layout.relative_key(&url, LinkKind::Page);
        self.recorder.record_mapping(key.clone(), url.to_string())?;

        if use_local {
            self.stats.pages_local += 1;
        } else {
            if let Err(e) = self.save_page(&url, &page).await {
                self.recorder.release_mapping(&key);
                return Err(e);
            }
            self.stats.pages_remote += 1;
        }

        Ok(())
    }

    fn follow_links(&mut self, links: Vec<DiscoveredLink>) -> Result<()> {
        for link in links {
            match link {
                DiscoveredLink::Page(url) => {
                    self.frontier.offer(url, LinkKind::Page);
                }
                DiscoveredLink::File(url) => {
                    if self.frontier.offer(url.clone(), LinkKind::File) == Offer::Download {
                        self.recorder.record_visited(url.as_str());
                        let key = self.layout.relative_key(&url, LinkKind::File);
                        self.recorder.record_mapping(key, url.to_string())?;
                        self.downloads.submit(url);
                    }
                }
                DiscoveredLink::Repository(root) => {
                    if self.recorder.record_repository(root.clone()) {
                        tracing::debug!("Found repository {}", root);
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes a live page to the mirror, tagged with the URL it was served from
    async fn save_page(&self, url: &CanonicalUrl, page: &RenderedPage) -> Result<()> {
        let path = self.layout.archive_path(url, LinkKind::Page);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, annotate_base(&page.html, &page.base_url)).await?;
        tracing::trace!("Saved {}", path.display());
        Ok(())
    }

    /// Settles a finished download's claim; only fatal errors are returned
    fn collect_download(&mut self, done: Result<CompletedDownload>) -> Result<()> {
        let CompletedDownload { key, result, .. } = done?;

        match result {
            Ok(DownloadOutcome::Cached) => {
                self.stats.files_cached += 1;
                Ok(())
            }
            Ok(DownloadOutcome::Downloaded { .. }) => {
                self.stats.files_downloaded += 1;
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                self.recorder.release_mapping(&key);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.recorder.release_mapping(&key);
                self.stats.files_failed += 1;
                Ok(())
            }
        }
    }

    /// Joins every outstanding download, then reports the first fatal error
    async fn finish_downloads(&mut self) -> Result<()> {
        let mut first_fatal = Ok(());
        for done in self.downloads.join_all().await {
            if let Err(e) = self.collect_download(done) {
                tracing::error!("{}", e);
                if first_fatal.is_ok() {
                    first_fatal = Err(e);
                }
            }
        }
        first_fatal
    }
}

/// Builds the configured renderer and runs a full crawl
///
/// This is the main entry point for archiving a course.
pub async fn run_archive(config: &Config) -> Result<RunOutcome> {
    let layout = ArchiveLayout::new(&config.output.out_dir);
    let renderer = build_renderer(config.crawler.renderer, &config.crawler, layout).await?;
    Crawler::new(config, renderer)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::ArchiveError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Serves canned HTML by canonical URL and logs each render
    struct ScriptedRenderer {
        pages: HashMap<String, String>,
        rendered: Arc<Mutex<Vec<(String, bool)>>>,
    }

    #[async_trait]
    impl PageRenderer for ScriptedRenderer {
        async fn render(&mut self, url: &CanonicalUrl, use_local: bool) -> Result<RenderedPage> {
            self.rendered
                .lock()
                .unwrap()
                .push((url.as_str().to_string(), use_local));
            let html = self
                .pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| ArchiveError::Navigation {
                    url: url.to_string(),
                    message: "HTTP 404".to_string(),
                })?;
            Ok(RenderedPage {
                html,
                base_url: url.url().clone(),
            })
        }
    }

    fn test_config(dir: &TempDir, use_cache: bool) -> Config {
        let out = dir.path().join("out");
        let toml = format!(
            r#"
            [site]
            course = "https://site/course"
            git = "https://git.host/org"

            [crawler]
            use-cache = {use_cache}
            renderer = "static"

            [output]
            out-dir = "{out}"
            visited-path = "{visited}"
            mappings-path = "{mappings}"
            repos-path = "{repos}"
            "#,
            out = out.display(),
            visited = dir.path().join("visited.txt").display(),
            mappings = dir.path().join("website-mappings.json").display(),
            repos = dir.path().join("repos.txt").display(),
        );
        parse_config(&toml).unwrap()
    }

    fn scripted(pages: &[(&str, &str)]) -> (Box<dyn PageRenderer>, Arc<Mutex<Vec<(String, bool)>>>) {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let renderer = ScriptedRenderer {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
            rendered: Arc::clone(&rendered),
        };
        (Box::new(renderer), rendered)
    }

    #[tokio::test]
    async fn test_siblings_render_in_reverse_discovery_order() {
        let dir = TempDir::new().unwrap();
        let (renderer, rendered) = scripted(&[
            (
                "https://site/course",
                r#"<a href="/course/a">A</a><a href="/course/b">B</a><a href="/course/c">C</a>"#,
            ),
            ("https://site/course/a", "<p>a</p>"),
            ("https://site/course/b", "<p>b</p>"),
            ("https://site/course/c", "<p>c</p>"),
        ]);

        let outcome = Crawler::new(&test_config(&dir, true), renderer)
            .unwrap()
            .run()
            .await
            .unwrap();

        let order: Vec<String> = rendered.lock().unwrap().iter().map(|(u, _)| u.clone()).collect();
        assert_eq!(
            order,
            vec![
                "https://site/course",
                "https://site/course/c",
                "https://site/course/b",
                "https://site/course/a",
            ]
        );
        assert_eq!(outcome.stats.pages_remote, 4);
        assert_eq!(outcome.recorder.visited(), order.as_slice());
    }

    #[tokio::test]
    async fn test_pages_saved_and_mapped() {
        let dir = TempDir::new().unwrap();
        let (renderer, _) = scripted(&[
            ("https://site/course", r#"<a href="/course/faq/">FAQ</a>"#),
            ("https://site/course/faq", "<h1>FAQ</h1>"),
        ]);

        let outcome = Crawler::new(&test_config(&dir, true), renderer)
            .unwrap()
            .run()
            .await
            .unwrap();

        let mappings = outcome.recorder.mappings();
        assert_eq!(mappings.get("course.html"), Some("https://site/course"));
        assert_eq!(mappings.get("course/faq.html"), Some("https://site/course/faq"));
        let saved = std::fs::read_to_string(dir.path().join("out/course/faq.html")).unwrap();
        assert!(saved.contains("<h1>FAQ</h1>"));
        assert!(saved.contains(r#"<meta name="archived-base" content="https://site/course/faq/">"#));
    }

    #[tokio::test]
    async fn test_cycles_visit_each_page_once() {
        let dir = TempDir::new().unwrap();
        let (renderer, rendered) = scripted(&[
            ("https://site/course", r#"<a href="/course/a">A</a><a href="/course/a?tab=2">A again</a>"#),
            ("https://site/course/a", r#"<a href="/course">Home</a><a href="/course/">Home</a>"#),
        ]);

        Crawler::new(&test_config(&dir, true), renderer)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(rendered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_pages_render_locally() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out/course.html"), "<p>old</p>").unwrap();

        let (renderer, rendered) = scripted(&[("https://site/course", "<p>old</p>")]);
        let outcome = Crawler::new(&test_config(&dir, true), renderer)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(
            rendered.lock().unwrap().as_slice(),
            &[("https://site/course".to_string(), true)]
        );
        assert_eq!(outcome.stats.pages_local, 1);
        assert_eq!(outcome.recorder.mappings().get("course.html"), Some("https://site/course"));
    }

    #[tokio::test]
    async fn test_cache_disabled_renders_remotely() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out/course.html"), "<p>old</p>").unwrap();

        let (renderer, rendered) = scripted(&[("https://site/course", "<p>new</p>")]);
        Crawler::new(&test_config(&dir, false), renderer)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert!(!rendered.lock().unwrap()[0].1);
        let saved = std::fs::read_to_string(dir.path().join("out/course.html")).unwrap();
        assert!(saved.contains("<p>new</p>"));
        assert!(!saved.contains("old"));
    }

    #[tokio::test]
    async fn test_repositories_collapse_and_flush() {
        let dir = TempDir::new().unwrap();
        let (renderer, _) = scripted(&[(
            "https://site/course",
            r#"
                <a href="https://git.host/org/p1/-/tree/main">p1</a>
                <a href="https://git.host/org/p1/-/blob/main/Makefile">p1 Makefile</a>
                <a href="https://git.host/org/p2">p2</a>
                <a href="https://elsewhere.org/org/p3">elsewhere</a>
            "#,
        )]);

        let outcome = Crawler::new(&test_config(&dir, true), renderer)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.stats.repositories, 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("repos.txt")).unwrap(),
            "https://git.host/org/p1\nhttps://git.host/org/p2"
        );
    }

    #[tokio::test]
    async fn test_navigation_failure_flushes_partial_state() {
        let dir = TempDir::new().unwrap();
        let (renderer, _) = scripted(&[(
            "https://site/course",
            r#"<a href="/course/broken">Broken</a>"#,
        )]);

        let err = Crawler::new(&test_config(&dir, true), renderer)
            .unwrap()
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Navigation { .. }));

        let visited = std::fs::read_to_string(dir.path().join("visited.txt")).unwrap();
        assert_eq!(visited, "https://site/course\nhttps://site/course/broken");

        let mappings = std::fs::read_to_string(dir.path().join("website-mappings.json")).unwrap();
        assert!(mappings.contains("\"course.html\": \"https://site/course\""));
        assert!(!mappings.contains("broken"));
    }
}
