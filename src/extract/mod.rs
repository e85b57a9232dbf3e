//! Extraction strategies that turn fetched bytes into [`ExtractedData`].
//!
//! Each strategy is a plain function; engines pick the one they need.
//! Values stored here are untrusted and only reach markup through
//! [`crate::render`].

pub mod canonical;
pub mod dom;
pub mod oembed;
pub mod opengraph;
pub mod page;
pub mod twitter_card;

use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use page::PageMeta;

/// Where an [`ExtractedData`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    OpenGraph,
    TwitterCard,
    OEmbed,
    DomQuery,
    JsonQuery,
    /// Nothing fetched; derived from the URL or response headers alone.
    Direct,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedData {
    strategy: Strategy,
    fields: BTreeMap<String, FieldValue>,
}

impl ExtractedData {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            fields: BTreeMap::new(),
        }
    }

    /// Builds data from a flat JSON object, keeping scalar members only.
    pub fn from_json_object(strategy: Strategy, object: &Map<String, Value>) -> Self {
        let mut data = Self::new(strategy);
        for (key, value) in object {
            match value {
                Value::String(s) => data.insert_text(key, s),
                Value::Number(n) => {
                    if let Some(n) = n.as_f64() {
                        data.insert_number(key, n);
                    }
                }
                Value::Bool(b) => data.insert_text(key, if *b { "true" } else { "false" }),
                _ => {}
            }
        }
        data
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Blank values are dropped so presence checks mean "usable".
    pub fn insert_text(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.fields
                .insert(key.to_string(), FieldValue::Text(value.to_string()));
        }
    }

    /// First writer wins.
    pub fn insert_text_if_absent(&mut self, key: &str, value: &str) {
        if !self.has(key) {
            self.insert_text(key, value);
        }
    }

    pub fn insert_number(&mut self, key: &str, value: f64) {
        if value.is_finite() {
            self.fields
                .insert(key.to_string(), FieldValue::Number(value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key)? {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::Number(_) => None,
        }
    }

    /// Numbers, or text that parses as one.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Display form of a field for interpolation.
    pub fn display(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            FieldValue::Number(n) => Some(n.to_string()),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn has_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.has(k))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
