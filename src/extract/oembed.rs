use super::{ExtractedData, PageMeta, Strategy};
use crate::OneboxError;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Known oEmbed providers, consulted before falling back to `<link>` discovery.
/// `{url}` in an endpoint is replaced with the form-encoded page URL.
pub const DEFAULT_PROVIDERS: &[(&str, &str, &str)] = &[
    (
        "youtube",
        r"^https?://(?:[a-z0-9-]+\.)?(?:youtube\.com|youtu\.be)/",
        "https://www.youtube.com/oembed?format=json&url={url}",
    ),
    (
        "vimeo",
        r"^https?://(?:www\.|player\.)?vimeo\.com/",
        "https://vimeo.com/api/oembed.json?url={url}",
    ),
    (
        "soundcloud",
        r"^https?://(?:www\.|m\.)?soundcloud\.com/",
        "https://soundcloud.com/oembed?format=json&url={url}",
    ),
    (
        "spotify",
        r"^https?://open\.spotify\.com/",
        "https://open.spotify.com/oembed?url={url}",
    ),
    (
        "twitter",
        r"^https?://(?:www\.|mobile\.)?(?:twitter|x)\.com/[^/]+/status/\d+",
        "https://publish.twitter.com/oembed?omit_script=1&url={url}",
    ),
];

const PATTERN_SIZE_LIMIT: usize = 1 << 20;

pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, OneboxError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| OneboxError::Config(format!("invalid pattern {pattern:?}: {e}")))
}

#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    pattern: Regex,
    endpoint: String,
}

impl Provider {
    pub fn new(name: &str, pattern: &str, endpoint: &str) -> Result<Self, OneboxError> {
        if !endpoint.contains("{url}") {
            return Err(OneboxError::Config(format!(
                "oEmbed endpoint for {name} lacks a {{url}} placeholder"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            pattern: compile_pattern(pattern)?,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.pattern.is_match(url.as_str())
    }

    /// The endpoint with the page URL substituted in.
    pub fn endpoint_for(&self, url: &Url) -> Option<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect();
        Url::parse(&self.endpoint.replace("{url}", &encoded)).ok()
    }
}

/// An ordered list of [`Provider`]s. First match wins.
#[derive(Debug, Clone, Default)]
pub struct ProviderTable {
    providers: Vec<Provider>,
}

impl ProviderTable {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn with_defaults() -> Result<Self, OneboxError> {
        let providers = DEFAULT_PROVIDERS
            .iter()
            .map(|(name, pattern, endpoint)| Provider::new(name, pattern, endpoint))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(providers))
    }

    pub fn get(&self, name: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn endpoint_for(&self, url: &Url) -> Option<Url> {
        self.providers
            .iter()
            .find(|p| p.matches(url))
            .and_then(|p| p.endpoint_for(url))
    }
}

/// The JSON oEmbed endpoint advertised by a page, resolved against `base`.
pub fn discover(meta: &PageMeta, base: &Url) -> Option<Url> {
    let href = meta.oembed_json.as_deref()?;
    let endpoint = base.join(href).ok()?;
    matches!(endpoint.scheme(), "http" | "https").then_some(endpoint)
}

/// Parses an oEmbed response body. Anything but a JSON object yields empty data.
pub fn parse_response(body: &[u8]) -> ExtractedData {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => ExtractedData::from_json_object(Strategy::OEmbed, &object),
        Ok(_) => {
            debug!("oEmbed response is not a JSON object");
            ExtractedData::new(Strategy::OEmbed)
        }
        Err(e) => {
            debug!(error = %e, "Malformed oEmbed response");
            ExtractedData::new(Strategy::OEmbed)
        }
    }
}
