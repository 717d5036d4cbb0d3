/// What a course link points at
///
/// Classification is purely by path shape. A downloadable resource with no
/// extension comes out as `Page`; that is a known limitation, not something
/// to patch here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Rendered in the browser, saved as `<path>.html`, links followed
    Page,
    /// Downloaded byte-for-byte, never rendered
    File,
}

impl LinkKind {
    /// Returns true for terminal links that must never enter the frontier
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }
}

/// Classifies a URL path as a page or a file
///
/// A path is a file when its final segment looks like `name.ext` (non-empty
/// name, non-empty extension) and sits below at least one directory, as in
/// `/a/b/c.ext`.
///
/// # Examples
///
/// ```
/// use course_archiver::url::{classify_link, LinkKind};
///
/// assert_eq!(classify_link("/course/slides.pdf"), LinkKind::File);
/// assert_eq!(classify_link("/course/faq"), LinkKind::Page);
/// ```
pub fn classify_link(path: &str) -> LinkKind {
    let Some((parent, last)) = path.rsplit_once('/') else {
        return LinkKind::Page;
    };

    // Needs at least one directory above the final segment
    if parent.trim_start_matches('/').is_empty() {
        return LinkKind::Page;
    }

    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => LinkKind::File,
        _ => LinkKind::Page,
    }
}
