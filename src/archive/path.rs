use crate::url::{classify_link, CanonicalUrl, LinkKind};
use std::path::{Path, PathBuf};
use url::Url;

/// Name used for a URL whose path is empty (the site root)
const ROOT_NAME: &str = "index";

/// Maps canonical URLs onto the mirror directory
///
/// The mapping is a pure function of the URL path, so a later run computes
/// the same locations and can find what an earlier run saved.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    out_dir: PathBuf,
}

impl ArchiveLayout {
    /// Creates a layout rooted at `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// The mirror root
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// The archive-relative key for a URL, `/`-separated
    ///
    /// Pages get an `.html` suffix; files keep their own extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use course_archiver::archive::ArchiveLayout;
    /// use course_archiver::url::{canonicalize, LinkKind};
    ///
    /// let course = Url::parse("https://site/course").unwrap();
    /// let layout = ArchiveLayout::new("out");
    /// let faq = canonicalize(&Url::parse("https://site/course/faq").unwrap(), false, &course).unwrap();
    /// assert_eq!(layout.relative_key(&faq, LinkKind::Page), "course/faq.html");
    /// ```
    pub fn relative_key(&self, url: &CanonicalUrl, kind: LinkKind) -> String {
        let base = url_path(url);
        match kind {
            LinkKind::Page => format!("{}.html", base),
            LinkKind::File => base,
        }
    }

    /// The on-disk location for a URL of the given kind
    pub fn archive_path(&self, url: &CanonicalUrl, kind: LinkKind) -> PathBuf {
        self.out_dir.join(self.relative_key(url, kind))
    }

    /// The on-disk location, classifying the URL by its path
    pub fn archive_path_for(&self, url: &CanonicalUrl) -> PathBuf {
        self.archive_path(url, classify_link(url.path()))
    }

    /// `file://` URL of a page's saved copy, for local navigation
    pub fn local_page_url(&self, url: &CanonicalUrl) -> std::io::Result<Url> {
        let absolute = std::path::absolute(self.archive_path(url, LinkKind::Page))?;
        Url::from_file_path(&absolute).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot express {} as a file URL", absolute.display()),
            )
        })
    }
}

/// The URL path without its leading and trailing slashes
fn url_path(url: &CanonicalUrl) -> String {
    let trimmed = url.path().trim_matches('/');
    if trimmed.is_empty() {
        ROOT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
