use super::{absolutize, card_template, fill_card_defaults, Engine, EngineContext, MatchPredicate};
use crate::extract::dom::{query_html, DomRule};
use crate::extract::ExtractedData;
use crate::render::{require_any, Markup, Template};
use crate::OneboxError;
use async_trait::async_trait;

const ARTICLE_PATTERN: &str = r"^https?://(?:[a-z0-9-]+\.)*wikipedia\.org/wiki/[^/?#]+";

const ARTICLE_FIELDS: &[DomRule] = &[
    DomRule::text("title", "h1#firstHeading"),
    DomRule::text("description", "div.mw-parser-output > p:not(.mw-empty-elt)"),
    DomRule::attr("image", r#"meta[property="og:image"]"#, "content"),
    DomRule::attr("link", r#"link[rel="canonical"]"#, "href"),
];

/// Wikipedia articles: heading, first paragraph and lead image.
pub struct WikipediaEngine {
    template: Template,
}

impl WikipediaEngine {
    pub fn new() -> Result<Self, OneboxError> {
        Ok(Self {
            template: card_template("wikipedia", "")?,
        })
    }
}

#[async_trait]
impl Engine for WikipediaEngine {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn matcher(&self) -> Result<MatchPredicate, OneboxError> {
        MatchPredicate::regex(ARTICLE_PATTERN)
    }

    fn always_https(&self) -> bool {
        true
    }

    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError> {
        let page = ctx.fetch_page(ctx.url).await?;
        let mut data = query_html(&page.body, ARTICLE_FIELDS);
        absolutize(&mut data, &page.final_url, &["image", "link"]);
        data.insert_text_if_absent("site_name", "Wikipedia");
        fill_card_defaults(&mut data, &page.final_url);
        Ok(data)
    }

    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError> {
        if !require_any(data, &["title"]) {
            return Ok(None);
        }
        Ok(Some(self.template.render(data, &ctx.render_context())))
    }
}
