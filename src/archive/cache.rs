use crate::archive::ArchiveLayout;
use crate::url::CanonicalUrl;

/// Answers "did an earlier run already save this URL?"
///
/// A pure existence check against the URL's archive path; it never creates
/// or touches anything, so any number of tasks may call it at once.
#[derive(Debug, Clone)]
pub struct CacheProber {
    layout: ArchiveLayout,
}

impl CacheProber {
    pub fn new(layout: ArchiveLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Returns true if the mirror already holds a copy of `url`
    ///
    /// Pages are looked up as `<path>.html`, files at `<path>`.
    pub async fn has_cached_copy(&self, url: &CanonicalUrl) -> bool {
        let path = self.layout.archive_path_for(url);
        let found = tokio::fs::try_exists(&path).await.unwrap_or(false);
        tracing::trace!("Cache lookup {} -> {} ({})", url, path.display(), found);
        found
    }
}
