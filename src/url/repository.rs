use url::Url;

/// Collapses a code-host link to the root of its repository
///
/// Keeps scheme, host, port and the first two path segments; everything
/// deeper, plus query and fragment, is dropped. Every file link into one
/// repository therefore yields the same reference.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use course_archiver::url::repository_root;
///
/// let link = Url::parse("https://git.host/org/repo/blob/main/x?plain=1#L3").unwrap();
/// assert_eq!(repository_root(&link), "https://git.host/org/repo");
/// ```
pub fn repository_root(url: &Url) -> String {
    let mut root = url.clone();

    let path = url
        .path()
        .split('/')
        .take(3)
        .collect::<Vec<_>>()
        .join("/");
    root.set_path(&path);
    root.set_query(None);
    root.set_fragment(None);

    root.to_string()
}
