use crate::engine::{EngineContext, Registered, Registry};
use crate::fetcher::{Fetcher, FetcherConfig, ReqwestTransport, Transport};
use crate::guard::{Guard, GuardConfig};
use crate::render::Markup;
use crate::utils::force_https;
use crate::{OneboxConfig, OneboxError};
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

/// A finished preview, ready for the caller's own sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPreview {
    pub full_html: String,
    pub placeholder_html: Option<String>,
    /// The engine that produced it.
    pub engine: &'static str,
}

/// The outcome of resolving one URL. Resolution never fails: every error
/// path ends in [`Resolution::NoPreview`] or [`Resolution::Rejected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Preview(RenderedPreview),
    /// Nothing embeddable. Callers render nothing.
    NoPreview,
    /// The guard refused the URL, or a redirect it led to.
    Rejected,
}

impl Resolution {
    pub fn is_preview(&self) -> bool {
        matches!(self, Resolution::Preview(_))
    }

    pub fn html(&self) -> Option<&str> {
        match self {
            Resolution::Preview(preview) => Some(&preview.full_html),
            _ => None,
        }
    }

    pub fn into_preview(self) -> Option<RenderedPreview> {
        match self {
            Resolution::Preview(preview) => Some(preview),
            _ => None,
        }
    }
}

/// The resolution pipeline: guard, match, engine, fallback.
///
/// Cloning is cheap and clones share the registry, the transport and the
/// concurrency limit.
#[derive(Clone)]
pub struct Onebox {
    config: Arc<OneboxConfig>,
    registry: Arc<Registry>,
    fetcher: Arc<Fetcher>,
    guard: Arc<Guard>,
    semaphore: Arc<Semaphore>,
}

impl Onebox {
    /// The default engines over a reqwest transport.
    pub fn new(config: OneboxConfig) -> Result<Self, OneboxError> {
        let transport = ReqwestTransport::new(FetcherConfig::from(&config))?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: OneboxConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, OneboxError> {
        let registry = Registry::with_defaults(&config)?;
        Self::with_parts(config, registry, transport)
    }

    pub fn with_parts(
        config: OneboxConfig,
        registry: Registry,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, OneboxError> {
        if let Err(e) = config.validate() {
            e.log();
            return Err(e);
        }
        let guard = Arc::new(Guard::new(GuardConfig::from(&config)));
        let fetcher = Arc::new(Fetcher::new(transport, guard.clone()));
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_resolutions));

        debug!(engines = registry.len(), "Onebox initialized");
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            fetcher,
            guard,
            semaphore,
        })
    }

    pub fn config(&self) -> &OneboxConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, raw_url: &str) -> Resolution {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Resolution semaphore closed");
                return Resolution::NoPreview;
            }
        };

        let url = match self.guard.check(raw_url) {
            Ok(url) => url,
            Err(e) => {
                e.log();
                return if e.is_rejection() {
                    Resolution::Rejected
                } else {
                    Resolution::NoPreview
                };
            }
        };

        let deadline = Instant::now() + self.config.resolve_timeout();
        match tokio::time::timeout_at(deadline, self.run(&url, deadline)).await {
            Ok(resolution) => resolution,
            Err(_) => {
                warn!(url = %url, budget = ?self.config.resolve_timeout(), "Resolution budget exhausted");
                Resolution::NoPreview
            }
        }
    }

    /// Resolves every URL concurrently, within the configured concurrency
    /// limit. Results are in input order.
    pub async fn resolve_batch<I, S>(&self, urls: I) -> Vec<Resolution>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        join_all(
            urls.into_iter()
                .map(|url| async move { self.resolve(url.as_ref()).await }),
        )
        .await
    }

    /// Like [`Onebox::resolve`], serving and storing previews in `cache`.
    #[cfg(feature = "cache")]
    pub async fn resolve_cached(&self, raw_url: &str, cache: &crate::PreviewCache) -> Resolution {
        let key = Url::parse(raw_url.trim()).map(|u| u.to_string());
        if let Ok(key) = &key {
            if let Some(preview) = cache.get(key) {
                debug!(url = %key, "Serving preview from cache");
                return Resolution::Preview(preview);
            }
        }

        let resolution = self.resolve(raw_url).await;
        if let (Ok(key), Resolution::Preview(preview)) = (key, &resolution) {
            cache.insert(key, preview.clone());
        }
        resolution
    }

    async fn run(&self, url: &Url, deadline: Instant) -> Resolution {
        match self.registry.select(url) {
            Some(entry) if !self.registry.is_fallback(entry) => {
                debug!(url = %url, engine = entry.name(), "Engine selected");
                match self.run_engine(entry, url, deadline).await {
                    Ok(Some(preview)) => return Resolution::Preview(preview),
                    Ok(None) => return Resolution::NoPreview,
                    Err(e) if e.is_rejection() => {
                        e.log();
                        return Resolution::Rejected;
                    }
                    Err(e) => {
                        warn!(engine = entry.name(), error = %e, "Engine failed, retrying with fallback");
                    }
                }
            }
            _ => debug!(url = %url, "No specific engine matched"),
        }

        let fallback = self.registry.fallback();
        match self.run_engine(fallback, url, deadline).await {
            Ok(Some(preview)) => Resolution::Preview(preview),
            Ok(None) => Resolution::NoPreview,
            Err(e) if e.is_rejection() => {
                e.log();
                Resolution::Rejected
            }
            Err(e) => {
                e.log();
                Resolution::NoPreview
            }
        }
    }

    /// Runs one engine end to end. Panics are reported as errors so the
    /// caller can fall back.
    async fn run_engine(
        &self,
        entry: &Registered,
        url: &Url,
        deadline: Instant,
    ) -> Result<Option<RenderedPreview>, OneboxError> {
        let url = if entry.descriptor.requires_https {
            force_https(url)
        } else {
            url.clone()
        };
        let ctx = EngineContext::new(
            &url,
            &entry.descriptor,
            &self.config,
            &self.fetcher,
            deadline,
        );
        let attempt = Self::attempt(entry, &ctx);
        match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(OneboxError::EnginePanicked(entry.name())),
        }
    }

    async fn attempt(
        entry: &Registered,
        ctx: &EngineContext<'_>,
    ) -> Result<Option<RenderedPreview>, OneboxError> {
        let engine = &entry.engine;
        let data = engine.extract(ctx).await?;
        debug!(engine = entry.name(), strategy = ?data.strategy(), fields = data.len(), "Extracted");

        let Some(full) = engine.to_html(ctx, &data)? else {
            debug!(engine = entry.name(), "Not enough data for a preview");
            return Ok(None);
        };
        let placeholder = engine.placeholder_html(ctx, &data);
        Ok(Some(RenderedPreview {
            full_html: full.into_string(),
            placeholder_html: placeholder.map(Markup::into_string),
            engine: entry.name(),
        }))
    }
}
