use url::Url;

/// `scheme://host[:port]`, as compared against iframe origin allowlists.
pub fn origin_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    Some(format!("{}://{}{}", url.scheme(), host, port))
}

pub fn force_https(url: &Url) -> Url {
    let mut upgraded = url.clone();
    if upgraded.scheme() == "http" {
        upgraded.set_scheme("https").ok();
    }
    upgraded
}

/// Case-insensitive check of the last path segment's extension.
pub fn has_extension(path: &str, extensions: &[&str]) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            extensions.iter().any(|e| ext.eq_ignore_ascii_case(e))
        }
        _ => false,
    }
}
