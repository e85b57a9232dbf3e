use super::{fill_card_defaults, Engine, EngineContext, MatchPredicate};
use crate::extract::dom::first_attr;
use crate::extract::oembed::ProviderTable;
use crate::extract::ExtractedData;
use crate::render::{require_any, Element, Markup};
use crate::OneboxError;
use async_trait::async_trait;
use url::Url;

const DEFAULT_WIDTH: u32 = 480;
const DEFAULT_HEIGHT: u32 = 360;

/// Embeds YouTube videos through the provider's oEmbed endpoint.
pub struct YoutubeEngine {
    providers: ProviderTable,
}

impl YoutubeEngine {
    pub fn new() -> Result<Self, OneboxError> {
        Ok(Self {
            providers: ProviderTable::with_defaults()?,
        })
    }
}

/// The video id from watch, short, embed and shorts URLs.
pub fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let id = if host == "youtu.be" {
        segments.next()?.to_string()
    } else {
        match segments.next()? {
            "watch" => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())?,
            "embed" | "shorts" | "live" | "v" => segments.next()?.to_string(),
            _ => return None,
        }
    };

    let valid = !id.is_empty()
        && id.len() <= 64
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    valid.then_some(id)
}

fn dimension(data: &ExtractedData, key: &str, default: u32) -> String {
    data.number(key)
        .filter(|n| *n > 0.0 && *n <= 4096.0)
        .map(|n| n as u32)
        .unwrap_or(default)
        .to_string()
}

#[async_trait]
impl Engine for YoutubeEngine {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn matcher(&self) -> Result<MatchPredicate, OneboxError> {
        Ok(MatchPredicate::domains(["youtube.com", "youtu.be"]))
    }

    fn always_https(&self) -> bool {
        true
    }

    fn iframe_origins(&self) -> &'static [&'static str] {
        &["https://www.youtube.com", "https://www.youtube-nocookie.com"]
    }

    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError> {
        let id = video_id(ctx.url)
            .ok_or_else(|| OneboxError::Extraction(format!("no video id in {}", ctx.url)))?;
        let endpoint = self
            .providers
            .get("youtube")
            .and_then(|provider| provider.endpoint_for(ctx.url))
            .ok_or_else(|| OneboxError::Extraction("no oEmbed endpoint for YouTube".into()))?;

        let mut data = ctx.oembed(&endpoint).await?;
        data.insert_text("video_id", &id);
        fill_card_defaults(&mut data, ctx.url);
        Ok(data)
    }

    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError> {
        if !require_any(data, &["title", "thumbnail_url"]) {
            return Ok(None);
        }
        let render = ctx.render_context();
        let Some(id) = data.text("video_id") else {
            return Ok(None);
        };

        let src = data
            .text("html")
            .and_then(|html| first_attr(html, "iframe", "src"))
            .and_then(|src| render.url(&src))
            .or_else(|| render.url(&format!("https://www.youtube.com/embed/{id}")))
            .ok_or_else(|| OneboxError::Render("unusable embed URL".into()))?;
        if !ctx.descriptor.allows_iframe(src.url()) {
            return Err(OneboxError::Render(format!(
                "iframe origin of {} is not allowed",
                src.as_str()
            )));
        }

        let iframe = Element::new("iframe")
            .url_attr("src", &src)
            .attr("width", dimension(data, "width", DEFAULT_WIDTH))
            .attr("height", dimension(data, "height", DEFAULT_HEIGHT))
            .attr("frameborder", "0")
            .flag("allowfullscreen")
            .attr_opt("title", data.text("title").map(|t| render.text(t)))
            .build();
        Ok(Some(
            Element::new("div")
                .attr("class", "onebox youtube-onebox")
                .child(iframe)
                .build(),
        ))
    }

    fn placeholder_html(&self, ctx: &EngineContext<'_>, data: &ExtractedData) -> Option<Markup> {
        let render = ctx.render_context();
        let thumbnail = data.text("thumbnail_url").and_then(|t| render.url(t))?;
        Some(
            Element::void("img")
                .url_attr("src", &thumbnail)
                .attr("class", "youtube-thumbnail")
                .attr("width", dimension(data, "thumbnail_width", DEFAULT_WIDTH))
                .attr("height", dimension(data, "thumbnail_height", DEFAULT_HEIGHT))
                .attr_opt("title", data.text("title").map(|t| render.text(t)))
                .build(),
        )
    }
}
