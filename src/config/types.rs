use serde::Deserialize;

/// Main configuration structure for Course-Archiver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The two origins the crawl is scoped to
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Course base URL; also the seed of the crawl
    pub course: String,

    /// Code-host base URL; links below it become repository references
    pub git: String,
}

/// Which engine loads pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RendererKind {
    /// Headless Chromium, scripts executed
    #[default]
    Chromium,
    /// Plain HTTP GET, no scripts
    Static,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Reuse pages and files already present in the output directory
    #[serde(rename = "use-cache", default = "default_use_cache")]
    pub use_cache: bool,

    /// Page loading engine
    #[serde(default)]
    pub renderer: RendererKind,

    /// Network quiet period treated as "page fully loaded" (milliseconds)
    #[serde(rename = "network-idle-ms", default = "default_network_idle_ms")]
    pub network_idle_ms: u64,

    /// Upper bound for a single navigation (seconds)
    #[serde(
        rename = "navigation-timeout-secs",
        default = "default_navigation_timeout_secs"
    )]
    pub navigation_timeout_secs: u64,

    /// Maximum number of file downloads in flight at once
    #[serde(
        rename = "max-concurrent-downloads",
        default = "default_max_concurrent_downloads"
    )]
    pub max_concurrent_downloads: usize,

    /// User-Agent header for downloads and static rendering
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root of the mirrored tree
    #[serde(rename = "out-dir", default = "default_out_dir")]
    pub out_dir: String,

    /// Newline-delimited list of visited canonical URLs
    #[serde(rename = "visited-path", default = "default_visited_path")]
    pub visited_path: String,

    /// JSON object of archive-relative path -> source URL
    #[serde(rename = "mappings-path", default = "default_mappings_path")]
    pub mappings_path: String,

    /// Newline-delimited list of repository root URLs
    #[serde(rename = "repos-path", default = "default_repos_path")]
    pub repos_path: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            use_cache: default_use_cache(),
            renderer: RendererKind::default(),
            network_idle_ms: default_network_idle_ms(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            visited_path: default_visited_path(),
            mappings_path: default_mappings_path(),
            repos_path: default_repos_path(),
        }
    }
}

fn default_use_cache() -> bool {
    true
}

fn default_network_idle_ms() -> u64 {
    500
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_downloads() -> usize {
    16
}

fn default_user_agent() -> String {
    format!("course-archiver/{}", env!("CARGO_PKG_VERSION"))
}

fn default_out_dir() -> String {
    "./out".to_string()
}

fn default_visited_path() -> String {
    "visited.txt".to_string()
}

fn default_mappings_path() -> String {
    "website-mappings.json".to_string()
}

fn default_repos_path() -> String {
    "repos.txt".to_string()
}
