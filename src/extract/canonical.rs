use super::PageMeta;
use url::Url;

/// The canonical URL to re-extract from, if the page points somewhere else.
///
/// A canonical link only counts when it names a different host or path than
/// the document it was found in, and the page has not set
/// `og:ignore_canonical`.
pub fn preferred_target(fetched: &Url, meta: &PageMeta) -> Option<Url> {
    if meta.ignores_canonical() {
        return None;
    }
    let canonical = fetched.join(meta.canonical.as_deref()?).ok()?;
    if !matches!(canonical.scheme(), "http" | "https") {
        return None;
    }

    let same_host = canonical.host_str() == fetched.host_str();
    let same_path = trim_slash(canonical.path()) == trim_slash(fetched.path());
    (!(same_host && same_path)).then_some(canonical)
}

fn trim_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
