//! The last-resort engine for any http(s) URL.
//!
//! Tried in order, stopping at the first that yields data:
//!
//! 1. a `HEAD` whose content type is image, video or audio,
//! 2. the same check on the `GET` response,
//! 3. oEmbed, from the static provider table or a `<link>` the page advertises,
//! 4. OpenGraph, then Twitter Card, then plain document metadata.

use super::media::{audio_markup, image_markup, video_markup};
use super::{absolutize, card_template, fill_card_defaults, Engine, EngineContext, MatchPredicate};
use crate::error::FetchFailure;
use crate::extract::dom::first_attr;
use crate::extract::oembed::{self, ProviderTable};
use crate::extract::{opengraph, twitter_card, ExtractedData, Strategy};
use crate::fetcher::{content_type, FetchResult};
use crate::render::{require_any, Element, Markup, Template};
use crate::OneboxError;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

const CARD_URL_FIELDS: &[&str] = &["image", "favicon", "link"];

pub struct GenericEngine {
    providers: ProviderTable,
    card: Template,
}

impl GenericEngine {
    pub fn new() -> Result<Self, OneboxError> {
        Self::with_providers(ProviderTable::with_defaults()?)
    }

    pub fn with_providers(providers: ProviderTable) -> Result<Self, OneboxError> {
        Ok(Self {
            providers,
            card: card_template("generic", "")?,
        })
    }

    async fn try_oembed(
        &self,
        ctx: &EngineContext<'_>,
        page_url: &Url,
        discovered: Option<Url>,
    ) -> Result<Option<ExtractedData>, OneboxError> {
        let Some(endpoint) = self.providers.endpoint_for(page_url).or(discovered) else {
            return Ok(None);
        };
        let mut data = ctx.oembed(&endpoint).await?;
        if data.is_empty() {
            debug!(endpoint = %endpoint, "oEmbed yielded nothing, using page metadata");
            return Ok(None);
        }
        for (from, to) in [("thumbnail_url", "image"), ("provider_name", "site_name")] {
            if let Some(value) = data.text(from).map(str::to_string) {
                data.insert_text_if_absent(to, &value);
            }
        }
        Ok(Some(data))
    }
}

/// The field a direct media link is stored under, by content type.
fn media_field(content_type: Option<&str>) -> Option<&'static str> {
    let content_type = content_type?;
    if content_type.starts_with("image/") {
        Some("image")
    } else if content_type.starts_with("video/") {
        Some("video_url")
    } else if content_type.starts_with("audio/") {
        Some("audio_url")
    } else {
        None
    }
}

fn direct_media(field: &str, url: &Url) -> ExtractedData {
    let mut data = ExtractedData::new(Strategy::Direct);
    data.insert_text(field, url.as_str());
    data.insert_text("link", url.as_str());
    data
}

#[async_trait]
impl Engine for GenericEngine {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn matcher(&self) -> Result<MatchPredicate, OneboxError> {
        Ok(MatchPredicate::Any)
    }

    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError> {
        match ctx.head(ctx.url).await {
            FetchResult::Success {
                headers, final_url, ..
            } => {
                if let Some(field) = media_field(content_type(&headers).as_deref()) {
                    return Ok(direct_media(field, &final_url));
                }
            }
            FetchResult::Failure {
                reason: FetchFailure::Rejected(host),
            } => return Err(OneboxError::GuardRejected(host)),
            _ => debug!(url = %ctx.url, "HEAD inconclusive, fetching the document"),
        }

        let page = ctx.fetch_page(ctx.url).await?;
        if let Some(field) = media_field(page.content_type.as_deref()) {
            return Ok(direct_media(field, &page.final_url));
        }
        if !page.is_html() {
            return Err(OneboxError::Extraction(format!(
                "unsupported content type {}",
                page.content_type.as_deref().unwrap_or("unknown")
            )));
        }

        let discovered = oembed::discover(&page.meta, &page.final_url);
        let mut data = match self.try_oembed(ctx, &page.final_url, discovered).await? {
            Some(data) => data,
            None if opengraph::is_present(&page.meta) => opengraph::extract(&page.meta),
            None if twitter_card::is_present(&page.meta) => {
                let mut data = twitter_card::extract(&page.meta);
                if let Some(title) = &page.meta.title {
                    data.insert_text_if_absent("title", title);
                }
                data
            }
            None => opengraph::extract(&page.meta),
        };

        absolutize(&mut data, &page.final_url, CARD_URL_FIELDS);
        fill_card_defaults(&mut data, &page.final_url);
        Ok(data)
    }

    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError> {
        let render = ctx.render_context();

        if data.strategy() == Strategy::Direct {
            let media = if let Some(src) = data.text("image").and_then(|s| render.url(s)) {
                Some(image_markup(&src))
            } else if let Some(src) = data.text("video_url").and_then(|s| render.url(s)) {
                Some(video_markup(&src))
            } else {
                data.text("audio_url")
                    .and_then(|s| render.url(s))
                    .map(|src| audio_markup(&src))
            };
            return Ok(media);
        }

        if data.strategy() == Strategy::OEmbed {
            if data.text("type") == Some("photo") {
                if let Some(src) = data.text("url").and_then(|s| render.url(s)) {
                    return Ok(Some(image_markup(&src)));
                }
            }
            let frame = data
                .text("html")
                .and_then(|html| first_attr(html, "iframe", "src"))
                .and_then(|src| render.url(&src));
            match frame {
                Some(src) if ctx.descriptor.allows_iframe(src.url()) => {
                    let iframe = Element::new("iframe")
                        .url_attr("src", &src)
                        .attr_opt("width", data.display("width"))
                        .attr_opt("height", data.display("height"))
                        .attr("frameborder", "0")
                        .flag("allowfullscreen")
                        .build();
                    return Ok(Some(iframe));
                }
                Some(src) => {
                    debug!(src = src.as_str(), "oEmbed iframe origin not allowed, rendering card")
                }
                None => {}
            }
        }

        if !require_any(data, &["title", "image"]) {
            return Ok(None);
        }
        Ok(Some(self.card.render(data, &render)))
    }

    fn placeholder_html(&self, ctx: &EngineContext<'_>, data: &ExtractedData) -> Option<Markup> {
        if data.strategy() != Strategy::Direct {
            return None;
        }
        let src = data.text("image").and_then(|s| ctx.render_context().url(s))?;
        Some(Element::void("img").url_attr("src", &src).build())
    }
}
