use crate::engine::Priority;
use crate::OneboxError;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

/// Engine ordering. Lower numbers are tried first; the generic engine is always last.
pub const DEFAULT_PRIORITIES: &[(&str, Priority)] = &[
    ("image", Priority::At(10)),
    ("video", Priority::At(11)),
    ("audio", Priority::At(12)),
    ("youtube", Priority::At(20)),
    ("twitter_status", Priority::At(30)),
    ("github_repo", Priority::At(40)),
    ("wikipedia", Priority::At(50)),
    ("generic", Priority::LastResort),
];

pub const DEFAULT_MAX_REDIRECTS: u8 = 3;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 250;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_CONCURRENT_RESOLUTIONS: usize = 500;

/// Deployment configuration, supplied once at startup and shared read-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OneboxConfig {
    pub max_redirects: u8,
    pub fetch_timeout_ms: u64,
    /// Wall-clock budget for one resolution, covering every fetch it makes.
    pub resolve_timeout_ms: u64,
    /// Title and description text is cut to this many display columns.
    pub max_text_length: usize,
    pub max_body_bytes: usize,
    pub user_agent: String,
    /// Hosts that are never fetched, matched on the host and its subdomains.
    pub host_denylist: HashSet<String>,
    /// When non-empty, only these hosts (and their subdomains) are fetched.
    pub host_allowlist: HashSet<String>,
    /// Per-engine replacement for the iframe origins an engine may emit.
    pub allowed_iframe_origins: HashMap<String, BTreeSet<String>>,
    /// Per-engine replacement for `DEFAULT_PRIORITIES`.
    pub priorities: HashMap<String, u32>,
    pub max_concurrent_resolutions: usize,
    pub cache_capacity: usize,
}

impl Default for OneboxConfig {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            resolve_timeout_ms: DEFAULT_RESOLVE_TIMEOUT_MS,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: concat!("onebox/", env!("CARGO_PKG_VERSION")).to_string(),
            host_denylist: HashSet::new(),
            host_allowlist: HashSet::new(),
            allowed_iframe_origins: HashMap::new(),
            priorities: HashMap::new(),
            max_concurrent_resolutions: MAX_CONCURRENT_RESOLUTIONS,
            cache_capacity: 1000,
        }
    }
}

impl OneboxConfig {
    pub fn from_json(json: &str) -> Result<Self, OneboxError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OneboxError::Config(format!("invalid config document: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OneboxError> {
        if self.fetch_timeout_ms == 0 || self.resolve_timeout_ms == 0 {
            return Err(OneboxError::Config("timeouts must be non-zero".into()));
        }
        if self.max_text_length == 0 {
            return Err(OneboxError::Config("max_text_length must be non-zero".into()));
        }
        if self.max_concurrent_resolutions == 0 {
            return Err(OneboxError::Config(
                "max_concurrent_resolutions must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    /// Looks up an engine's priority, preferring the deployment override.
    pub fn priority_for(&self, engine: &str) -> Option<Priority> {
        if let Some(value) = self.priorities.get(engine) {
            return Some(Priority::At(*value));
        }
        DEFAULT_PRIORITIES
            .iter()
            .find(|(name, _)| *name == engine)
            .map(|(_, priority)| *priority)
    }

    pub fn with_max_redirects(mut self, max_redirects: u8) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    pub fn with_denied_host(mut self, host: impl Into<String>) -> Self {
        self.host_denylist.insert(host.into().to_ascii_lowercase());
        self
    }

    pub fn with_allowed_host(mut self, host: impl Into<String>) -> Self {
        self.host_allowlist.insert(host.into().to_ascii_lowercase());
        self
    }

    pub fn with_iframe_origins<I, S>(mut self, engine: &str, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_iframe_origins.insert(
            engine.to_string(),
            origins.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_priority(mut self, engine: &str, priority: u32) -> Self {
        self.priorities.insert(engine.to_string(), priority);
        self
    }

    pub fn with_max_concurrent_resolutions(mut self, max: usize) -> Self {
        self.max_concurrent_resolutions = max;
        self
    }
}
