use super::page::collapse_whitespace;
use super::{ExtractedData, Strategy};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

/// What to read from the first element a [`DomRule`] selects.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    /// Whitespace-collapsed text content.
    Text,
    Attr(&'static str),
}

/// Stores the first non-blank match of `selector` under `key`.
#[derive(Debug, Clone, Copy)]
pub struct DomRule {
    pub key: &'static str,
    pub selector: &'static str,
    pub target: Target,
}

impl DomRule {
    pub const fn text(key: &'static str, selector: &'static str) -> Self {
        Self {
            key,
            selector,
            target: Target::Text,
        }
    }

    pub const fn attr(key: &'static str, selector: &'static str, attr: &'static str) -> Self {
        Self {
            key,
            selector,
            target: Target::Attr(attr),
        }
    }
}

pub fn query_html(html: &str, rules: &[DomRule]) -> ExtractedData {
    let document = Html::parse_document(html);
    let mut data = ExtractedData::new(Strategy::DomQuery);

    for rule in rules {
        let selector = match Selector::parse(rule.selector) {
            Ok(selector) => selector,
            Err(e) => {
                warn!(selector = rule.selector, error = ?e, "Skipping invalid selector");
                continue;
            }
        };
        let value = document.select(&selector).find_map(|el| {
            let value = match rule.target {
                Target::Text => collapse_whitespace(&el.text().collect::<String>()),
                Target::Attr(name) => el.value().attr(name)?.trim().to_string(),
            };
            (!value.is_empty()).then_some(value)
        });
        if let Some(value) = value {
            data.insert_text(rule.key, &value);
        }
    }

    data
}

/// Stores the scalar at a JSON pointer under `key`.
#[derive(Debug, Clone, Copy)]
pub struct JsonRule {
    pub key: &'static str,
    pub pointer: &'static str,
}

impl JsonRule {
    pub const fn new(key: &'static str, pointer: &'static str) -> Self {
        Self { key, pointer }
    }
}

/// Malformed JSON degrades to empty data.
pub fn query_json(body: &[u8], rules: &[JsonRule]) -> ExtractedData {
    let mut data = ExtractedData::new(Strategy::JsonQuery);
    let document: Value = match serde_json::from_slice(body) {
        Ok(document) => document,
        Err(e) => {
            debug!(error = %e, "Malformed JSON document");
            return data;
        }
    };

    for rule in rules {
        match document.pointer(rule.pointer) {
            Some(Value::String(s)) => data.insert_text(rule.key, s),
            Some(Value::Number(n)) => {
                if let Some(n) = n.as_f64() {
                    data.insert_number(rule.key, n);
                }
            }
            Some(Value::Bool(b)) => data.insert_text(rule.key, &b.to_string()),
            _ => {}
        }
    }

    data
}

/// First value of `attr` on an element matching `selector` in an HTML fragment.
pub fn first_attr(fragment: &str, selector: &str, attr: &str) -> Option<String> {
    let fragment = Html::parse_fragment(fragment);
    let selector = Selector::parse(selector).ok()?;
    fragment
        .select(&selector)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
