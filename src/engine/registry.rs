use super::generic::GenericEngine;
use super::github::GithubRepoEngine;
use super::media::{AudioEngine, ImageEngine, VideoEngine};
use super::twitter::TwitterStatusEngine;
use super::wikipedia::WikipediaEngine;
use super::youtube::YoutubeEngine;
use super::{Engine, EngineDescriptor, Priority};
use crate::{OneboxConfig, OneboxError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// An engine together with its registration record.
#[derive(Clone)]
pub struct Registered {
    pub descriptor: EngineDescriptor,
    pub engine: Arc<dyn Engine>,
}

impl Registered {
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }
}

/// The ordered engine table. Built once, then shared read-only.
#[derive(Clone)]
pub struct Registry {
    /// Sorted by priority; registration order breaks ties.
    entries: Vec<Registered>,
    fallback: Registered,
}

impl Registry {
    pub fn builder(config: &OneboxConfig) -> RegistryBuilder<'_> {
        RegistryBuilder {
            config,
            entries: Vec::new(),
            fallback: None,
        }
    }

    /// Every engine this crate ships, at the configured priorities.
    pub fn with_defaults(config: &OneboxConfig) -> Result<Self, OneboxError> {
        Self::builder(config)
            .register(ImageEngine)?
            .register(VideoEngine)?
            .register(AudioEngine)?
            .register(YoutubeEngine::new()?)?
            .register(TwitterStatusEngine::new()?)?
            .register(GithubRepoEngine::new()?)?
            .register(WikipediaEngine::new()?)?
            .fallback(GenericEngine::new()?)?
            .build()
    }

    /// All matching engines in the order they would be tried.
    pub fn resolve(&self, url: &Url) -> Vec<&Registered> {
        self.entries
            .iter()
            .filter(|entry| entry.descriptor.matches(url))
            .collect()
    }

    /// The first matching engine by ascending priority.
    pub fn select(&self, url: &Url) -> Option<&Registered> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.matches(url))
    }

    pub fn fallback(&self) -> &Registered {
        &self.fallback
    }

    pub fn is_fallback(&self, entry: &Registered) -> bool {
        entry.name() == self.fallback.name()
    }

    pub fn engines(&self) -> impl Iterator<Item = &Registered> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct RegistryBuilder<'a> {
    config: &'a OneboxConfig,
    entries: Vec<Registered>,
    fallback: Option<Registered>,
}

impl RegistryBuilder<'_> {
    /// Registers an engine at the priority the configuration assigns to its name.
    pub fn register<E: Engine + 'static>(self, engine: E) -> Result<Self, OneboxError> {
        let priority = self.config.priority_for(engine.name()).ok_or_else(|| {
            OneboxError::Config(format!("no priority configured for engine {}", engine.name()))
        })?;
        self.register_at(engine, priority)
    }

    /// `Priority::LastResort` is reserved for [`RegistryBuilder::fallback`].
    pub fn register_at<E: Engine + 'static>(
        mut self,
        engine: E,
        priority: Priority,
    ) -> Result<Self, OneboxError> {
        if priority == Priority::LastResort {
            return Err(OneboxError::Config(format!(
                "engine {} cannot be registered as last resort; use fallback()",
                engine.name()
            )));
        }
        let entry = self.describe(Arc::new(engine), priority)?;
        self.ensure_unique(&entry)?;
        if let Some(clash) = self
            .entries
            .iter()
            .find(|e| e.descriptor.priority == priority)
        {
            warn!(
                engine = entry.name(),
                other = clash.name(),
                ?priority,
                "Engines share a priority; registration order decides"
            );
        }
        self.entries.push(entry);
        Ok(self)
    }

    /// Registers the last-resort engine used when nothing matches or an engine fails.
    pub fn fallback<E: Engine + 'static>(mut self, engine: E) -> Result<Self, OneboxError> {
        if self.fallback.is_some() {
            return Err(OneboxError::Config("fallback engine registered twice".into()));
        }
        let entry = self.describe(Arc::new(engine), Priority::LastResort)?;
        self.ensure_unique(&entry)?;
        self.fallback = Some(entry.clone());
        self.entries.push(entry);
        Ok(self)
    }

    fn ensure_unique(&self, entry: &Registered) -> Result<(), OneboxError> {
        if self.entries.iter().any(|e| e.name() == entry.name()) {
            return Err(OneboxError::Config(format!(
                "engine {} registered twice",
                entry.name()
            )));
        }
        Ok(())
    }

    fn describe(&self, engine: Arc<dyn Engine>, priority: Priority) -> Result<Registered, OneboxError> {
        let name = engine.name();
        let allowed_iframe_origins = match self.config.allowed_iframe_origins.get(name) {
            Some(origins) => origins.clone(),
            None => engine
                .iframe_origins()
                .iter()
                .map(|o| o.to_string())
                .collect::<BTreeSet<_>>(),
        };
        let descriptor = EngineDescriptor {
            name,
            priority,
            matcher: engine.matcher()?,
            requires_https: engine.always_https(),
            allowed_iframe_origins,
        };
        Ok(Registered { descriptor, engine })
    }

    pub fn build(self) -> Result<Registry, OneboxError> {
        let fallback = self
            .fallback
            .ok_or_else(|| OneboxError::Config("no fallback engine registered".into()))?;
        let mut entries = self.entries;
        // Stable: equal priorities keep registration order.
        entries.sort_by_key(|entry| entry.descriptor.priority);

        debug!(
            engines = ?entries.iter().map(Registered::name).collect::<Vec<_>>(),
            "Engine registry built"
        );
        Ok(Registry { entries, fallback })
    }
}
