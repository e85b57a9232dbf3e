use super::EngineDescriptor;
use crate::extract::{canonical, oembed, ExtractedData, PageMeta, Strategy};
use crate::fetcher::{FetchResult, Fetched, Fetcher};
use crate::render::RenderContext;
use crate::error::FetchFailure;
use crate::{OneboxConfig, OneboxError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

/// An HTML (or other) document fetched for extraction.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: Url,
    pub content_type: Option<String>,
    pub body: String,
    pub meta: PageMeta,
}

impl FetchedPage {
    pub fn is_html(&self) -> bool {
        match self.content_type.as_deref() {
            None => true,
            Some(ct) => ct == "text/html" || ct == "application/xhtml+xml",
        }
    }
}

/// Everything an engine may use while resolving one URL.
///
/// Every fetch issued through the context goes through the guard, is limited
/// to the configured redirect depth, and gets whichever is smaller of the
/// per-fetch timeout and the time left in the resolution budget.
pub struct EngineContext<'a> {
    pub url: &'a Url,
    pub descriptor: &'a EngineDescriptor,
    pub config: &'a OneboxConfig,
    fetcher: &'a Fetcher,
    deadline: Instant,
}

impl<'a> EngineContext<'a> {
    pub fn new(
        url: &'a Url,
        descriptor: &'a EngineDescriptor,
        config: &'a OneboxConfig,
        fetcher: &'a Fetcher,
        deadline: Instant,
    ) -> Self {
        Self {
            url,
            descriptor,
            config,
            fetcher,
            deadline,
        }
    }

    fn timeout(&self) -> Duration {
        self.config
            .fetch_timeout()
            .min(self.deadline.saturating_duration_since(Instant::now()))
    }

    pub async fn get(&self, url: &Url) -> FetchResult {
        self.fetcher
            .fetch(url, self.config.max_redirects, self.timeout())
            .await
    }

    pub async fn head(&self, url: &Url) -> FetchResult {
        self.fetcher
            .head(url, self.config.max_redirects, self.timeout())
            .await
    }

    /// GET that must succeed.
    pub async fn fetch(&self, url: &Url) -> Result<Fetched, OneboxError> {
        self.get(url).await.into_fetched()
    }

    /// Fetches a page and scans its metadata, moving to the canonical URL
    /// when the page names a different one.
    pub async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, OneboxError> {
        let page = self.fetch_page_once(url).await?;
        if !page.is_html() {
            return Ok(page);
        }

        let Some(target) = canonical::preferred_target(&page.final_url, &page.meta) else {
            return Ok(page);
        };

        debug!(from = %page.final_url, to = %target, "Following canonical link");
        match self.fetch_page_once(&target).await {
            Ok(canonical) if canonical.is_html() => Ok(canonical),
            Ok(_) => Ok(page),
            Err(e) if e.is_rejection() => Err(e),
            Err(e) => {
                debug!(error = %e, "Canonical fetch failed, keeping original document");
                Ok(page)
            }
        }
    }

    async fn fetch_page_once(&self, url: &Url) -> Result<FetchedPage, OneboxError> {
        let fetched = self.fetch(url).await?;
        let content_type = fetched.content_type();
        let body = fetched.text();
        let page = FetchedPage {
            meta: PageMeta::default(),
            final_url: fetched.final_url,
            content_type,
            body,
        };
        if page.is_html() {
            let meta = PageMeta::parse(&page.body);
            return Ok(FetchedPage { meta, ..page });
        }
        Ok(page)
    }

    /// Fetches and parses an oEmbed endpoint. A guard rejection is an error;
    /// any other failure yields empty data.
    pub async fn oembed(&self, endpoint: &Url) -> Result<ExtractedData, OneboxError> {
        match self.get(endpoint).await {
            FetchResult::Success { body, .. } => Ok(oembed::parse_response(&body)),
            FetchResult::Failure {
                reason: FetchFailure::Rejected(host),
            } => Err(OneboxError::GuardRejected(host)),
            FetchResult::Failure { reason } => {
                debug!(endpoint = %endpoint, error = %reason, "oEmbed fetch failed");
                Ok(ExtractedData::new(Strategy::OEmbed))
            }
            FetchResult::Redirect { .. } => Ok(ExtractedData::new(Strategy::OEmbed)),
        }
    }

    pub fn render_context(&self) -> RenderContext<'_> {
        RenderContext {
            base: self.url,
            max_text_length: self.config.max_text_length,
            force_https: self.descriptor.requires_https,
        }
    }
}
