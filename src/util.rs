use std::path::Path;
use url::Url;

/// Returns the last non-empty path segment of a link target, ignoring query and fragment.
///
/// `/philosopher/Kierkegaard/` and `http://host/comic/12?x=1` yield `Kierkegaard` and `12`.
pub fn last_segment(href: &str) -> Option<&str> {
    let end = href.find(|c: char| c == '?' || c == '#').unwrap_or_else(|| href.len());
    href[..end]
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Returns file extension of the last path segment of given URL, without leading dot.
pub fn file_ext(url: &Url) -> Option<String> {
    let name = url.path_segments()?.last()?;
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}
