//! Engines for direct links to media files. Nothing is fetched: the URL is
//! the media.

use super::{Engine, EngineContext, MatchPredicate};
use crate::extract::{ExtractedData, Strategy};
use crate::render::{Element, Markup, SafeUrl};
use crate::utils::has_extension;
use crate::OneboxError;
use async_trait::async_trait;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "bmp", "svg"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "ogv"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "oga", "wav", "m4a", "flac", "opus"];

pub(crate) fn image_markup(src: &SafeUrl) -> Markup {
    Element::new("a")
        .url_attr("href", src)
        .attr("class", "onebox")
        .attr("target", "_blank")
        .attr("rel", "nofollow ugc noopener")
        .child(
            Element::void("img")
                .url_attr("src", src)
                .attr("class", "onebox-image")
                .attr("loading", "lazy")
                .build(),
        )
        .build()
}

pub(crate) fn video_markup(src: &SafeUrl) -> Markup {
    Element::new("div")
        .attr("class", "onebox video-onebox")
        .child(
            Element::new("video")
                .attr("width", "100%")
                .attr("height", "100%")
                .flag("controls")
                .attr("preload", "metadata")
                .child(Element::void("source").url_attr("src", src).build())
                .child(fallback_link(src))
                .build(),
        )
        .build()
}

pub(crate) fn audio_markup(src: &SafeUrl) -> Markup {
    Element::new("audio")
        .flag("controls")
        .attr("preload", "metadata")
        .child(Element::void("source").url_attr("src", src).build())
        .child(fallback_link(src))
        .build()
}

fn fallback_link(src: &SafeUrl) -> Markup {
    Element::new("a")
        .url_attr("href", src)
        .attr("rel", "nofollow ugc noopener")
        .text(src.as_str())
        .build()
}

fn direct(ctx: &EngineContext<'_>, key: &str) -> ExtractedData {
    let mut data = ExtractedData::new(Strategy::Direct);
    data.insert_text(key, ctx.url.as_str());
    data.insert_text("link", ctx.url.as_str());
    data
}

fn source(ctx: &EngineContext<'_>, data: &ExtractedData, key: &str) -> Option<SafeUrl> {
    data.text(key).and_then(|raw| ctx.render_context().url(raw))
}

pub struct ImageEngine;

#[async_trait]
impl Engine for ImageEngine {
    fn name(&self) -> &'static str {
        "image"
    }

    fn matcher(&self) -> Result<MatchPredicate, OneboxError> {
        Ok(MatchPredicate::Path(|path| has_extension(path, IMAGE_EXTENSIONS)))
    }

    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError> {
        Ok(direct(ctx, "image"))
    }

    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError> {
        Ok(source(ctx, data, "image").map(|src| image_markup(&src)))
    }

    fn placeholder_html(&self, ctx: &EngineContext<'_>, data: &ExtractedData) -> Option<Markup> {
        let src = source(ctx, data, "image")?;
        Some(Element::void("img").url_attr("src", &src).build())
    }
}

pub struct VideoEngine;

#[async_trait]
impl Engine for VideoEngine {
    fn name(&self) -> &'static str {
        "video"
    }

    fn matcher(&self) -> Result<MatchPredicate, OneboxError> {
        Ok(MatchPredicate::Path(|path| has_extension(path, VIDEO_EXTENSIONS)))
    }

    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError> {
        Ok(direct(ctx, "video_url"))
    }

    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError> {
        Ok(source(ctx, data, "video_url").map(|src| video_markup(&src)))
    }

    fn placeholder_html(&self, _ctx: &EngineContext<'_>, _data: &ExtractedData) -> Option<Markup> {
        Some(
            Element::new("div")
                .attr("class", "onebox-placeholder-container")
                .child(
                    Element::new("span")
                        .attr("class", "placeholder-icon video")
                        .build(),
                )
                .build(),
        )
    }
}

pub struct AudioEngine;

#[async_trait]
impl Engine for AudioEngine {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn matcher(&self) -> Result<MatchPredicate, OneboxError> {
        Ok(MatchPredicate::Path(|path| has_extension(path, AUDIO_EXTENSIONS)))
    }

    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError> {
        Ok(direct(ctx, "audio_url"))
    }

    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError> {
        Ok(source(ctx, data, "audio_url").map(|src| audio_markup(&src)))
    }
}
