//! URL handling module for Course-Archiver
//!
//! This module provides link canonicalization, the page/file heuristic,
//! repository-root normalization, and classification of a link against the
//! two configured origins.

mod classify;
mod normalize;
mod repository;

use crate::config::SiteConfig;
use crate::ConfigError;
use url::Url;

// Re-export main functions
pub use classify::{classify_link, LinkKind};
pub use normalize::{canonicalize, canonicalize_str, CanonicalUrl};
pub use repository::repository_root;

/// Where a discovered link belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkTarget {
    /// Under the course base URL - crawled or downloaded
    Course,
    /// Under the code-host base URL - recorded as a repository reference
    Repository,
    /// Anything else - ignored
    External,
}

/// The two origins a crawl is scoped to
#[derive(Debug, Clone)]
pub struct SiteScope {
    course: Url,
    git: Url,
}

impl SiteScope {
    /// Builds a scope from already-parsed base URLs
    pub fn new(course: Url, git: Url) -> Self {
        Self { course, git }
    }

    /// Builds a scope from the `[site]` configuration section
    pub fn from_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        let course = Url::parse(&site.course)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", site.course, e)))?;
        let git = Url::parse(&site.git)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", site.git, e)))?;
        Ok(Self::new(course, git))
    }

    /// The course base URL (the crawl seed)
    pub fn course(&self) -> &Url {
        &self.course
    }

    /// The code-host base URL
    pub fn git(&self) -> &Url {
        &self.git
    }

    /// Classifies an absolute link
    ///
    /// Course scope is checked first. A `file:` link read from a page that was
    /// loaded out of the local mirror counts as same-origin, because local
    /// navigation rewrote its origin.
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use course_archiver::url::{LinkTarget, SiteScope};
    ///
    /// let scope = SiteScope::new(
    ///     Url::parse("https://site/course").unwrap(),
    ///     Url::parse("https://git.host/org").unwrap(),
    /// );
    /// let faq = Url::parse("https://site/course/faq").unwrap();
    /// assert_eq!(scope.classify(&faq, false), LinkTarget::Course);
    /// ```
    pub fn classify(&self, url: &Url, was_from_cache: bool) -> LinkTarget {
        let local_origin = was_from_cache && url.scheme() == "file";

        if (local_origin || same_origin(url, &self.course)) && path_within(url, &self.course) {
            LinkTarget::Course
        } else if same_origin(url, &self.git) && path_within(url, &self.git) {
            LinkTarget::Repository
        } else {
            LinkTarget::External
        }
    }
}

/// Host and port equality; the scheme may differ (http vs https)
pub(crate) fn same_origin(url: &Url, base: &Url) -> bool {
    url.host_str().map(|h| h.to_lowercase()) == base.host_str().map(|h| h.to_lowercase())
        && url.port_or_known_default() == base.port_or_known_default()
}

/// Segment-aware path prefix test
fn path_within(url: &Url, base: &Url) -> bool {
    let prefix = base.path().trim_end_matches('/');
    let path = url.path();

    prefix.is_empty()
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
