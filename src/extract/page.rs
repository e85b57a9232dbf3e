use scraper::{Html, Selector};
use std::collections::BTreeMap;

/// Metadata scanned from an HTML document's `<meta>`, `<link>` and `<title>` tags.
///
/// Parsing happens in one synchronous pass so the (non-`Send`) DOM never
/// lives across an await point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    /// `og:*` properties, prefix stripped, first occurrence wins.
    pub open_graph: BTreeMap<String, String>,
    /// `twitter:*` names or properties, prefix stripped, hyphens as underscores.
    pub twitter: BTreeMap<String, String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical: Option<String>,
    pub oembed_json: Option<String>,
    pub favicon: Option<String>,
}

impl PageMeta {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut meta = PageMeta::default();

        if let Ok(selector) = Selector::parse("meta") {
            for element in document.select(&selector) {
                let el = element.value();
                let content = match el.attr("content").map(str::trim) {
                    Some(c) if !c.is_empty() => c,
                    _ => continue,
                };
                let property = el.attr("property").map(str::trim);
                let name = el.attr("name").map(str::trim);

                for key in [property, name].into_iter().flatten() {
                    let key = key.to_ascii_lowercase();
                    if let Some(og) = key.strip_prefix("og:") {
                        meta.open_graph
                            .entry(og.to_string())
                            .or_insert_with(|| content.to_string());
                    } else if let Some(tw) = key.strip_prefix("twitter:") {
                        meta.twitter
                            .entry(tw.replace('-', "_"))
                            .or_insert_with(|| content.to_string());
                    } else if key == "description" && meta.description.is_none() {
                        meta.description = Some(content.to_string());
                    }
                }
            }
        }

        if let Ok(selector) = Selector::parse("link[href]") {
            for element in document.select(&selector) {
                let el = element.value();
                let href = match el.attr("href").map(str::trim) {
                    Some(h) if !h.is_empty() => h.to_string(),
                    _ => continue,
                };
                let rel = el.attr("rel").unwrap_or_default().to_ascii_lowercase();
                let kind = el.attr("type").unwrap_or_default().to_ascii_lowercase();

                if kind == "application/json+oembed" && meta.oembed_json.is_none() {
                    meta.oembed_json = Some(href);
                } else if rel.split_whitespace().any(|r| r == "canonical")
                    && meta.canonical.is_none()
                {
                    meta.canonical = Some(href);
                } else if rel.split_whitespace().any(|r| r == "icon") && meta.favicon.is_none() {
                    meta.favicon = Some(href);
                }
            }
        }

        if let Ok(selector) = Selector::parse("title") {
            meta.title = document
                .select(&selector)
                .next()
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|t| !t.is_empty());
        }

        meta
    }

    /// `og:ignore_canonical` opts a page out of canonical-link preference.
    pub fn ignores_canonical(&self) -> bool {
        self.open_graph
            .get("ignore_canonical")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>  Test
      Page </title>
    <meta property="og:title" content="OG Title">
    <meta property="og:title" content="Second title">
    <meta property="og:image:width" content="1200">
    <meta property="og:custom_thing" content="kept">
    <meta name="twitter:card" content="summary_large_image">
    <meta property="twitter:image-alt" content="alt text">
    <meta name="description" content="Plain description">
    <meta property="og:description" content="">
    <link rel="canonical" href="https://example.com/canonical">
    <link rel="alternate" type="application/json+oembed" href="/oembed?id=1">
    <link rel="shortcut icon" href="/favicon.ico">
</head>
<body></body>
</html>"#;

    #[test]
    fn scans_meta_and_links() {
        let meta = PageMeta::parse(PAGE);

        assert_eq!(meta.open_graph.get("title").unwrap(), "OG Title");
        assert_eq!(meta.open_graph.get("image:width").unwrap(), "1200");
        assert_eq!(meta.open_graph.get("custom_thing").unwrap(), "kept");
        assert!(!meta.open_graph.contains_key("description"));
        assert_eq!(meta.twitter.get("card").unwrap(), "summary_large_image");
        assert_eq!(meta.twitter.get("image_alt").unwrap(), "alt text");
        assert_eq!(meta.title.as_deref(), Some("Test Page"));
        assert_eq!(meta.description.as_deref(), Some("Plain description"));
        assert_eq!(meta.canonical.as_deref(), Some("https://example.com/canonical"));
        assert_eq!(meta.oembed_json.as_deref(), Some("/oembed?id=1"));
        assert_eq!(meta.favicon.as_deref(), Some("/favicon.ico"));
        assert!(!meta.ignores_canonical());
    }

    #[test]
    fn tolerates_garbage() {
        let meta = PageMeta::parse("<<<not html at all>>> <meta content>");
        assert!(meta.open_graph.is_empty());
        assert!(meta.canonical.is_none());
    }
}
