//! Course-Archiver: a mirror builder for course websites
//!
//! This crate crawls a course website with a headless browser, saves every
//! reachable page and linked file under an output directory, and records a
//! table from archived path back to the source URL, plus the list of code
//! repositories the course links to.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod output;
pub mod prompt;
pub mod url;

use thiserror::Error;

/// Main error type for Course-Archiver operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("Mapping collision at {path}: already mapped to {existing}, attempted {attempted}")]
    MappingCollision {
        path: String,
        existing: String,
        attempted: String,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ArchiveError {
    /// Returns true if the error must stop the crawl
    ///
    /// Only a single failed download is survivable; everything else
    /// (navigation, collisions, local IO) halts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Download { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Course-Archiver operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, RunOutcome};
pub use url::{canonicalize, classify_link, CanonicalUrl, LinkKind, LinkTarget, SiteScope};
