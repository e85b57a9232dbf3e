use super::{Markup, RenderContext};
use crate::extract::ExtractedData;
use crate::OneboxError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Text(String),
    Url(String),
    Section {
        key: String,
        inverted: bool,
        body: Vec<Token>,
    },
}

/// A logic-less template over [`ExtractedData`].
///
/// * `{{key}}` inserts the field as truncated, escaped text.
/// * `{{url:key}}` inserts the field as a normalized, escaped URL, or nothing.
/// * `{{#key}}…{{/key}}` renders its body only when the field is present,
///   `{{^key}}…{{/key}}` only when it is absent.
///
/// Template source is trusted; field values never are.
#[derive(Debug, Clone)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, OneboxError> {
        let mut stack: Vec<(String, bool, Vec<Token>)> = Vec::new();
        let mut current: Vec<Token> = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                current.push(Token::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| OneboxError::Config("unclosed template tag".into()))?;
            let tag = after[..end].trim();
            rest = &after[end + 2..];

            if let Some(key) = tag.strip_prefix('#') {
                stack.push((key.trim().to_string(), false, std::mem::take(&mut current)));
            } else if let Some(key) = tag.strip_prefix('^') {
                stack.push((key.trim().to_string(), true, std::mem::take(&mut current)));
            } else if let Some(key) = tag.strip_prefix('/') {
                let (open, inverted, parent) = stack.pop().ok_or_else(|| {
                    OneboxError::Config(format!("unexpected template close tag {key:?}"))
                })?;
                if open != key.trim() {
                    return Err(OneboxError::Config(format!(
                        "template section {open:?} closed by {key:?}"
                    )));
                }
                let body = std::mem::replace(&mut current, parent);
                current.push(Token::Section {
                    key: open,
                    inverted,
                    body,
                });
            } else if let Some(key) = tag.strip_prefix("url:") {
                current.push(Token::Url(key.trim().to_string()));
            } else if tag.is_empty() {
                return Err(OneboxError::Config("empty template tag".into()));
            } else {
                current.push(Token::Text(tag.to_string()));
            }
        }

        if !rest.is_empty() {
            current.push(Token::Literal(rest.to_string()));
        }
        if let Some((open, _, _)) = stack.last() {
            return Err(OneboxError::Config(format!(
                "template section {open:?} is never closed"
            )));
        }

        Ok(Self { tokens: current })
    }

    pub fn render(&self, data: &ExtractedData, ctx: &RenderContext<'_>) -> Markup {
        let mut html = String::new();
        render_tokens(&self.tokens, data, ctx, &mut html);
        Markup::trusted(html)
    }
}

fn render_tokens(tokens: &[Token], data: &ExtractedData, ctx: &RenderContext<'_>, html: &mut String) {
    for token in tokens {
        match token {
            Token::Literal(text) => html.push_str(text),
            Token::Text(key) => {
                if let Some(value) = data.display(key) {
                    html.push_str(&html_escape::encode_safe(&ctx.text(&value)));
                }
            }
            Token::Url(key) => {
                if let Some(url) = data.text(key).and_then(|v| ctx.url(v)) {
                    html.push_str(&html_escape::encode_double_quoted_attribute(url.as_str()));
                }
            }
            Token::Section {
                key,
                inverted,
                body,
            } => {
                if data.has(key) != *inverted {
                    render_tokens(body, data, ctx, html);
                }
            }
        }
    }
}
