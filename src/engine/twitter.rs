use super::{absolutize, card_template, fill_card_defaults, Engine, EngineContext, MatchPredicate};
use crate::extract::{twitter_card, ExtractedData};
use crate::render::{require_any, Markup, Template};
use crate::OneboxError;
use async_trait::async_trait;

const STATUS_PATTERN: &str = r"^https?://(?:www\.|mobile\.)?(?:twitter|x)\.com/[^/?#]+/status(?:es)?/\d+";

/// Single posts on Twitter/X, read from the page's Twitter Card tags.
pub struct TwitterStatusEngine {
    template: Template,
}

impl TwitterStatusEngine {
    pub fn new() -> Result<Self, OneboxError> {
        Ok(Self {
            template: card_template("twitter-status", "")?,
        })
    }
}

#[async_trait]
impl Engine for TwitterStatusEngine {
    fn name(&self) -> &'static str {
        "twitter_status"
    }

    fn matcher(&self) -> Result<MatchPredicate, OneboxError> {
        MatchPredicate::regex(STATUS_PATTERN)
    }

    fn always_https(&self) -> bool {
        true
    }

    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError> {
        let page = ctx.fetch_page(ctx.url).await?;
        let mut data = twitter_card::extract(&page.meta);
        if let Some(site) = data.text("site").map(str::to_string) {
            data.insert_text_if_absent("site_name", &site);
        }
        absolutize(&mut data, &page.final_url, &["image"]);
        fill_card_defaults(&mut data, ctx.url);
        Ok(data)
    }

    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError> {
        if !require_any(data, &["title", "description"]) {
            return Ok(None);
        }
        Ok(Some(self.template.render(data, &ctx.render_context())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn matches_status_urls_on_both_domains() {
        let matcher = TwitterStatusEngine::new().unwrap().matcher().unwrap();
        for url in [
            "https://twitter.com/rustlang/status/1234567890",
            "http://mobile.twitter.com/rustlang/statuses/1",
            "https://X.com/rustlang/status/42?s=20",
        ] {
            assert!(matcher.matches(&Url::parse(url).unwrap()), "{url}");
        }
        for url in [
            "https://twitter.com/rustlang",
            "https://x.com/rustlang/status/",
            "https://nottwitter.com/a/status/1",
        ] {
            assert!(!matcher.matches(&Url::parse(url).unwrap()), "{url}");
        }
    }
}
