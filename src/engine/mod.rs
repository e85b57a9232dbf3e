//! Engines: a URL predicate plus a way to turn a matching URL into markup.

mod context;
mod registry;

pub mod generic;
pub mod github;
pub mod media;
pub mod twitter;
pub mod wikipedia;
pub mod youtube;

pub use context::{EngineContext, FetchedPage};
pub use registry::{Registered, Registry, RegistryBuilder};

use crate::extract::oembed::compile_pattern;
use crate::extract::ExtractedData;
use crate::render::{Markup, Template};
use crate::OneboxError;
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use url::Url;

/// Engine ordering key. `At(n)` sorts before every larger `n`, and all of
/// them sort before `LastResort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    At(u32),
    LastResort,
}

/// A pure predicate over a parsed URL.
///
/// Regexes use the `regex` crate, which matches in linear time, so
/// attacker-controlled URLs cannot trigger catastrophic backtracking.
#[derive(Clone)]
pub enum MatchPredicate {
    /// Matches every http(s) URL.
    Any,
    /// Host equals one of the domains or is a subdomain of one.
    Domain(BTreeSet<String>),
    /// Tested against the full serialized URL.
    Regex(Regex),
    /// Tested against the URL path.
    Path(fn(&str) -> bool),
    And(Vec<MatchPredicate>),
    Or(Vec<MatchPredicate>),
}

impl MatchPredicate {
    pub fn domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        MatchPredicate::Domain(
            domains
                .into_iter()
                .map(|d| d.as_ref().trim_end_matches('.').to_ascii_lowercase())
                .collect(),
        )
    }

    /// Fails for patterns that do not compile; callers surface this at startup.
    pub fn regex(pattern: &str) -> Result<Self, OneboxError> {
        Ok(MatchPredicate::Regex(compile_pattern(pattern)?))
    }

    pub fn matches(&self, url: &Url) -> bool {
        match self {
            MatchPredicate::Any => matches!(url.scheme(), "http" | "https"),
            MatchPredicate::Domain(domains) => {
                let host = match url.host_str() {
                    Some(host) => host.trim_end_matches('.'),
                    None => return false,
                };
                domains.iter().any(|d| {
                    host == d
                        || (host.len() > d.len()
                            && host.ends_with(d.as_str())
                            && host.as_bytes()[host.len() - d.len() - 1] == b'.')
                })
            }
            MatchPredicate::Regex(regex) => regex.is_match(url.as_str()),
            MatchPredicate::Path(predicate) => predicate(url.path()),
            MatchPredicate::And(all) => all.iter().all(|p| p.matches(url)),
            MatchPredicate::Or(any) => any.iter().any(|p| p.matches(url)),
        }
    }
}

impl fmt::Debug for MatchPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPredicate::Any => f.write_str("Any"),
            MatchPredicate::Domain(d) => f.debug_tuple("Domain").field(d).finish(),
            MatchPredicate::Regex(r) => f.debug_tuple("Regex").field(&r.as_str()).finish(),
            MatchPredicate::Path(_) => f.write_str("Path(<fn>)"),
            MatchPredicate::And(all) => f.debug_tuple("And").field(all).finish(),
            MatchPredicate::Or(any) => f.debug_tuple("Or").field(any).finish(),
        }
    }
}

/// Registration record for one engine. Built once at startup, then read-only.
#[derive(Debug, Clone)]
pub struct EngineDescriptor {
    pub name: &'static str,
    pub priority: Priority,
    pub matcher: MatchPredicate,
    /// Rewrite `http://` to `https://` before fetching and rendering.
    pub requires_https: bool,
    /// Origins (`scheme://host[:port]`) allowed in any emitted `<iframe src>`.
    pub allowed_iframe_origins: BTreeSet<String>,
}

impl EngineDescriptor {
    pub fn matches(&self, url: &Url) -> bool {
        self.matcher.matches(url)
    }

    pub fn allows_iframe(&self, src: &Url) -> bool {
        crate::utils::origin_of(src)
            .map(|origin| self.allowed_iframe_origins.contains(&origin))
            .unwrap_or(false)
    }
}

/// A preview engine.
///
/// Engines are stateless: everything belonging to one resolution lives in the
/// [`EngineContext`] and the [`ExtractedData`] passed between the stages, so a
/// single instance serves concurrent resolutions.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Key into the priority table and the per-engine configuration maps.
    fn name(&self) -> &'static str;

    fn matcher(&self) -> Result<MatchPredicate, OneboxError>;

    fn always_https(&self) -> bool {
        false
    }

    /// Default iframe origins; deployments may replace them per engine.
    fn iframe_origins(&self) -> &'static [&'static str] {
        &[]
    }

    /// Fetches whatever the engine needs and runs its extraction strategy.
    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError>;

    /// Full preview, or `None` when `data` lacks the fields this engine needs.
    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError>;

    /// Cheap stand-in for lazy loading.
    fn placeholder_html(&self, _ctx: &EngineContext<'_>, _data: &ExtractedData) -> Option<Markup> {
        None
    }
}

const CARD_TEMPLATE: &str = concat!(
    r#"<aside class="onebox $class">"#,
    r#"<header class="source">{{#favicon}}<img src="{{url:favicon}}" class="site-icon" width="16" height="16">{{/favicon}}"#,
    r#"<a href="{{url:link}}" target="_blank" rel="nofollow ugc noopener">{{#site_name}}{{site_name}}{{/site_name}}{{^site_name}}{{domain}}{{/site_name}}</a></header>"#,
    r#"<article class="onebox-body">{{#image}}<img src="{{url:image}}" class="thumbnail">{{/image}}"#,
    r#"<h3><a href="{{url:link}}" target="_blank" rel="nofollow ugc noopener">{{title}}</a></h3>"#,
    r#"{{#description}}<p>{{description}}</p>{{/description}}$extra</article>"#,
    r#"</aside>"#,
);

/// The shared preview card, with `extra` appended inside the body.
pub(crate) fn card_template(class: &str, extra: &str) -> Result<Template, OneboxError> {
    Template::parse(
        &CARD_TEMPLATE
            .replacen("$class", class, 1)
            .replacen("$extra", extra, 1),
    )
}

/// Fills the keys every card reads: `link` and `domain`.
pub(crate) fn fill_card_defaults(data: &mut ExtractedData, url: &Url) {
    data.insert_text_if_absent("link", url.as_str());
    if let Some(host) = url.host_str() {
        data.insert_text_if_absent("domain", host.trim_start_matches("www."));
    }
}

/// Rewrites relative URL fields against the document they came from and
/// drops any that do not resolve to http(s).
pub(crate) fn absolutize(data: &mut ExtractedData, base: &Url, keys: &[&str]) {
    for key in keys {
        let Some(raw) = data.text(key) else { continue };
        match base.join(raw) {
            Ok(joined) if matches!(joined.scheme(), "http" | "https") => {
                data.insert_text(key, joined.as_str())
            }
            _ => {
                data.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn priorities_order_last_resort_last() {
        let mut priorities = vec![Priority::LastResort, Priority::At(50), Priority::At(1)];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::At(1), Priority::At(50), Priority::LastResort]
        );
    }

    #[test]
    fn domain_predicate_matches_subdomains_only_on_label_boundary() {
        let predicate = MatchPredicate::domains(["github.com"]);
        assert!(predicate.matches(&url("https://github.com/a/b")));
        assert!(predicate.matches(&url("https://gist.github.com/a")));
        assert!(!predicate.matches(&url("https://evilgithub.com/a/b")));
        assert!(!predicate.matches(&url("https://github.com.evil.net/a")));
    }

    #[test]
    fn composite_predicates() {
        let predicate = MatchPredicate::And(vec![
            MatchPredicate::domains(["example.com"]),
            MatchPredicate::Path(|p| p.starts_with("/video/")),
        ]);
        assert!(predicate.matches(&url("https://example.com/video/1")));
        assert!(!predicate.matches(&url("https://example.com/audio/1")));
        assert!(!predicate.matches(&url("https://other.com/video/1")));

        let either = MatchPredicate::Or(vec![
            MatchPredicate::regex(r"^https://a\.test/").unwrap(),
            MatchPredicate::Path(|p| p.ends_with(".gif")),
        ]);
        assert!(either.matches(&url("https://a.test/x")));
        assert!(either.matches(&url("https://b.test/x.gif")));
        assert!(!either.matches(&url("https://b.test/x")));
    }

    #[test]
    fn invalid_regex_is_a_config_error() {
        let err = MatchPredicate::regex("(unbalanced").unwrap_err();
        assert!(matches!(err, OneboxError::Config(_)));
    }

    #[test]
    fn card_defaults_and_absolute_urls() {
        let page = url("https://www.example.com/post/1");
        let mut data = ExtractedData::new(crate::extract::Strategy::OpenGraph);
        data.insert_text("image", "../img/a.png");
        data.insert_text("favicon", "javascript:alert(1)");
        fill_card_defaults(&mut data, &page);
        absolutize(&mut data, &page, &["image", "favicon"]);

        assert_eq!(data.text("link"), Some("https://www.example.com/post/1"));
        assert_eq!(data.text("domain"), Some("example.com"));
        assert_eq!(data.text("image"), Some("https://www.example.com/img/a.png"));
        assert!(!data.has("favicon"));
        assert!(card_template("generic", "").is_ok());
    }

    #[test]
    fn any_rejects_non_http() {
        assert!(MatchPredicate::Any.matches(&url("http://a.test/")));
        assert!(!MatchPredicate::Any.matches(&url("ftp://a.test/")));
    }
}
