//! Link extraction from rendered pages
//!
//! This module handles:
//! - Reading every `<a href>` from the rendered DOM, in document order
//! - Resolving hrefs to absolute URLs (honoring `<base href>`)
//! - Sorting each link into course page, course file, or repository reference
//!
//! A page saved to the mirror carries `<meta name="archived-base">` with the
//! URL it was served from (after redirects), so a later run reading the saved
//! copy resolves relative links exactly as the live run did.

use crate::url::{
    canonicalize, classify_link, repository_root, CanonicalUrl, LinkKind, LinkTarget, SiteScope,
};
use scraper::{Html, Selector};
use url::Url;

/// Meta tag name holding the URL a saved page was served from
pub const ARCHIVED_BASE_META: &str = "archived-base";

/// A classified outgoing link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveredLink {
    /// In-scope page, to be offered to the frontier
    Page(CanonicalUrl),
    /// In-scope file, to be downloaded
    File(CanonicalUrl),
    /// Root URL of a repository on the code host
    Repository(String),
}

/// Extracts and classifies the outgoing links of a rendered page
///
/// Links outside both the course and code-host scopes are dropped. The
/// result keeps document order, which the LIFO frontier turns into reverse
/// visiting order.
///
/// # Arguments
///
/// * `html` - The rendered DOM
/// * `base_url` - URL the page was rendered at
/// * `scope` - The course and code-host origins
/// * `was_from_cache` - Whether the page was loaded out of the mirror
pub fn extract_links(
    html: &str,
    base_url: &Url,
    scope: &SiteScope,
    was_from_cache: bool,
) -> Vec<DiscoveredLink> {
    let mut discovered = Vec::new();

    for link in extract_anchor_urls(html, base_url) {
        match scope.classify(&link, was_from_cache) {
            LinkTarget::External => {}
            LinkTarget::Repository => discovered.push(DiscoveredLink::Repository(repository_root(&link))),
            LinkTarget::Course => {
                let canonical = match canonicalize(&link, was_from_cache, scope.course()) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::debug!("Skipping link {}: {}", link, e);
                        continue;
                    }
                };

                match classify_link(canonical.path()) {
                    LinkKind::File => discovered.push(DiscoveredLink::File(canonical)),
                    LinkKind::Page => discovered.push(DiscoveredLink::Page(canonical)),
                }
            }
        }
    }

    discovered
}

/// Resolves every anchor's href against the document base
pub fn extract_anchor_urls(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let base = document_base(&document, base_url);

    let mut links = Vec::new();
    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, &base) {
                    links.push(absolute_url);
                }
            }
        }
    }

    tracing::trace!("Extracted {} anchors from {}", links.len(), base_url);
    links
}

/// The effective base for relative links
///
/// `<base href>` wins, resolved against the archived base if the page has
/// one; then the archived base; then the URL the page was rendered at.
fn document_base(document: &Html, page_url: &Url) -> Url {
    let archived = first_attr(document, "meta[name=\"archived-base\"][content]", "content")
        .and_then(|content| Url::parse(content.trim()).ok())
        .unwrap_or_else(|| page_url.clone());

    first_attr(document, "base[href]", "href")
        .and_then(|href| archived.join(href.trim()).ok())
        .unwrap_or(archived)
}

fn first_attr<'a>(document: &'a Html, selector: &str, attr: &str) -> Option<&'a str> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr))
}

/// Tags a page with the URL it was served from, for saving to the mirror
///
/// The tag goes right after the opening `<head>`; documents without one get
/// it prepended.
pub fn annotate_base(html: &str, base_url: &Url) -> String {
    let content = base_url.as_str().replace('&', "&amp;").replace('"', "&quot;");
    let tag = format!(r#"<meta name="{}" content="{}">"#, ARCHIVED_BASE_META, content);

    let at = head_open_end(html).unwrap_or(0);
    let mut annotated = String::with_capacity(html.len() + tag.len());
    annotated.push_str(&html[..at]);
    annotated.push_str(&tag);
    annotated.push_str(&html[at..]);
    annotated
}

/// Byte offset just past the opening `<head ...>` tag
fn head_open_end(html: &str) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    let mut from = 0;
    while let Some(offset) = lower[from..].find("<head") {
        let after = from + offset + "<head".len();
        match lower.as_bytes().get(after) {
            Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r') => {
                return lower[after..].find('>').map(|end| after + end + 1);
            }
            // <header> and friends
            _ => from = after,
        }
    }
    None
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - hrefs that do not resolve
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    base_url.join(href).ok()
}
