use super::same_origin;
use crate::UrlError;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

/// A URL reduced to its crawl identity
///
/// The key never carries a query string, a fragment, or a trailing slash.
/// Equality and hashing use the key only, so two links that differ in those
/// respects collapse to the same frontier entry.
#[derive(Debug, Clone)]
pub struct CanonicalUrl {
    key: String,
    url: Url,
}

impl CanonicalUrl {
    /// The canonical string form, as written to the visited log
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The parsed form, for navigation and path derivation
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The percent-encoded path component
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

impl PartialEq for CanonicalUrl {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CanonicalUrl {}

impl Hash for CanonicalUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Canonicalizes a discovered link
///
/// # Canonicalization Steps
///
/// 1. Put the link on the course origin (scheme, host and port of `course`)
///    when it was read from a page loaded out of the local mirror, or when it
///    already points at the course host and port under another scheme. Local
///    navigation turns root-relative links into `file:` URLs, which would
///    otherwise fall out of scope.
/// 2. Remove the query string and the fragment
/// 3. Reject anything that is not HTTP(S)
/// 4. Remove exactly one trailing slash
///
/// # Arguments
///
/// * `url` - The absolute link
/// * `was_loaded_from_cache` - Whether the page holding the link came from disk
/// * `course` - The configured course base URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use course_archiver::url::canonicalize;
///
/// let course = Url::parse("https://site/course").unwrap();
/// let link = Url::parse("https://site/course/faq/?tab=2#top").unwrap();
/// let canonical = canonicalize(&link, false, &course).unwrap();
/// assert_eq!(canonical.as_str(), "https://site/course/faq");
/// ```
pub fn canonicalize(
    url: &Url,
    was_loaded_from_cache: bool,
    course: &Url,
) -> Result<CanonicalUrl, UrlError> {
    let mut url = if was_loaded_from_cache || same_origin(url, course) {
        let mut rebased = course.clone();
        rebased.set_path(url.path());
        rebased
    } else {
        url.clone()
    };

    url.set_query(None);
    url.set_fragment(None);

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS links can be archived, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(url.to_string()));
    }

    let mut key = url.to_string();
    if key.ends_with('/') {
        key.pop();
    }

    Ok(CanonicalUrl { key, url })
}

/// Parses and canonicalizes a URL string that is already absolute
pub fn canonicalize_str(
    raw: &str,
    was_loaded_from_cache: bool,
    course: &Url,
) -> Result<CanonicalUrl, UrlError> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    canonicalize(&url, was_loaded_from_cache, course)
}
