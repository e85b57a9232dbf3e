//! Safe markup construction.
//!
//! Engines never concatenate strings into HTML. They build [`Markup`] through
//! [`Element`] or a [`Template`], both of which escape every interpolated
//! value. URL-valued attributes additionally go through [`normalize_url`]
//! first, so the order is always: normalize, then escape, then quote.

mod template;

pub use template::Template;

use crate::extract::ExtractedData;
use std::fmt;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use url::Url;

/// Escaped, well-formed HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Escapes `text` into a text node.
    pub fn text(text: &str) -> Self {
        Markup(html_escape::encode_safe(text).into_owned())
    }

    pub(crate) fn trusted(html: String) -> Self {
        Markup(html)
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An absolute http(s) URL that has been through [`normalize_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeUrl(Url);

impl SafeUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

/// Resolves `raw` against `base` and keeps it only if it is http(s).
///
/// Serializing through [`Url`] percent-encodes spaces, quotes and other
/// unsafe characters. With `force_https`, plain http is upgraded.
pub fn normalize_url(raw: &str, base: &Url, force_https: bool) -> Option<SafeUrl> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut url = base.join(raw).ok()?;
    match url.scheme() {
        "https" => {}
        "http" if force_https => url.set_scheme("https").ok()?,
        "http" => {}
        _ => return None,
    }
    url.host_str()?;
    Some(SafeUrl(url))
}

/// Collapses whitespace and cuts `text` to `max_width` display columns,
/// ending with an ellipsis when shortened.
pub fn truncate_text(text: &str, max_width: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.width() <= max_width {
        return text;
    }

    let mut result = String::new();
    let mut width = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        result.push(c);
        width += w;
    }
    result.truncate(result.trim_end().len());
    result.push('…');
    result
}

/// The data needed to produce a preview is present.
pub fn require_any(data: &ExtractedData, keys: &[&str]) -> bool {
    data.has_any(keys)
}

/// Per-render settings derived from the resolving engine and configuration.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub base: &'a Url,
    pub max_text_length: usize,
    pub force_https: bool,
}

impl RenderContext<'_> {
    pub fn url(&self, raw: &str) -> Option<SafeUrl> {
        normalize_url(raw, self.base, self.force_https)
    }

    pub fn text(&self, raw: &str) -> String {
        truncate_text(raw, self.max_text_length)
    }
}

enum Child {
    Text(String),
    Markup(Markup),
}

/// Programmatic builder for a single HTML element.
pub struct Element {
    name: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<Child>,
    void: bool,
}

impl Element {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
            void: false,
        }
    }

    /// An element with no closing tag, such as `img`.
    pub fn void(name: &'static str) -> Self {
        Self {
            void: true,
            ..Self::new(name)
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn attr_opt(self, name: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// An attribute with no value, such as `controls`.
    pub fn flag(mut self, name: &'static str) -> Self {
        self.attrs.push((name, String::new()));
        self
    }

    pub fn url_attr(self, name: &'static str, url: &SafeUrl) -> Self {
        self.attr(name, url.as_str())
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Child::Text(text.into()));
        self
    }

    pub fn child(mut self, child: Markup) -> Self {
        self.children.push(Child::Markup(child));
        self
    }

    pub fn build(self) -> Markup {
        let mut html = format!("<{}", self.name);
        for (name, value) in &self.attrs {
            html.push(' ');
            html.push_str(name);
            if !value.is_empty() {
                html.push_str("=\"");
                html.push_str(&html_escape::encode_double_quoted_attribute(value));
                html.push('"');
            }
        }
        html.push('>');
        if self.void {
            return Markup(html);
        }
        for child in self.children {
            match child {
                Child::Text(text) => html.push_str(&html_escape::encode_safe(&text)),
                Child::Markup(markup) => html.push_str(markup.as_str()),
            }
        }
        html.push_str("</");
        html.push_str(self.name);
        html.push('>');
        Markup(html)
    }
}

/// Joins several fragments in order.
pub fn concat(parts: impl IntoIterator<Item = Markup>) -> Markup {
    Markup(parts.into_iter().map(Markup::into_string).collect())
}
