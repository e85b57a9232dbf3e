use crate::{OneboxConfig, OneboxError};
use std::collections::HashSet;
use url::{Host, Url};

/// Configuration for the fetch guard
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Allowed URL schemes (default: ["http", "https"])
    pub allowed_schemes: HashSet<String>,
    /// Hosts never fetched; a suffix match also covers subdomains
    pub host_denylist: HashSet<String>,
    /// If not empty, only these hosts (and subdomains) are fetched
    pub host_allowlist: HashSet<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: ["http", "https"].iter().map(|s| s.to_string()).collect(),
            host_denylist: HashSet::new(),
            host_allowlist: HashSet::new(),
        }
    }
}

impl From<&OneboxConfig> for GuardConfig {
    fn from(config: &OneboxConfig) -> Self {
        Self {
            host_denylist: lowercase_set(&config.host_denylist),
            host_allowlist: lowercase_set(&config.host_allowlist),
            ..Self::default()
        }
    }
}

fn lowercase_set(hosts: &HashSet<String>) -> HashSet<String> {
    hosts
        .iter()
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
        .collect()
}

/// Decides whether a URL may be fetched.
///
/// Literal IP addresses are never fetchable: real preview targets are DNS
/// names. Host checks always run on the parsed authority, so decimal, octal
/// and hex IPv4 spellings are caught once the WHATWG parser has normalized
/// them. DNS answers are not inspected; a name resolving to a private address
/// is not caught here.
#[derive(Debug, Clone)]
pub struct Guard {
    config: GuardConfig,
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

impl Guard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    /// Parses and validates a raw URL string.
    pub fn check(&self, raw: &str) -> Result<Url, OneboxError> {
        let url = Url::parse(raw.trim())?;
        self.check_url(&url)?;
        Ok(url)
    }

    pub fn check_url(&self, url: &Url) -> Result<(), OneboxError> {
        if !self.config.allowed_schemes.contains(url.scheme()) {
            return Err(OneboxError::GuardRejected(format!(
                "scheme {} not allowed",
                url.scheme()
            )));
        }
        match url.host() {
            Some(host) => self.check_host(&host),
            None => Err(OneboxError::GuardRejected("missing host".into())),
        }
    }

    /// Boolean form of [`Guard::check_url`]; `false` means "produce no preview".
    pub fn is_safe(&self, url: &Url) -> bool {
        self.check_url(url).is_ok()
    }

    /// Accepts either a full URL or a bare host name.
    pub fn is_safe_str(&self, host_or_url: &str) -> bool {
        let input = host_or_url.trim();
        if input.contains("://") {
            return self.check(input).is_ok();
        }
        match Host::parse(input) {
            Ok(host) => self.check_host(&host).is_ok(),
            Err(_) => false,
        }
    }

    fn check_host<S: AsRef<str>>(&self, host: &Host<S>) -> Result<(), OneboxError> {
        let domain = match host {
            Host::Ipv4(ip) => return Err(OneboxError::GuardRejected(ip.to_string())),
            Host::Ipv6(ip) => return Err(OneboxError::GuardRejected(ip.to_string())),
            Host::Domain(domain) => domain.as_ref().trim_end_matches('.').to_ascii_lowercase(),
        };

        if domain.is_empty() || is_localhost(&domain) {
            return Err(OneboxError::GuardRejected(domain));
        }

        if !self.config.host_allowlist.is_empty()
            && !matches_any(&domain, &self.config.host_allowlist)
        {
            return Err(OneboxError::GuardRejected(domain));
        }

        if matches_any(&domain, &self.config.host_denylist) {
            return Err(OneboxError::GuardRejected(domain));
        }

        Ok(())
    }
}

fn matches_any(domain: &str, hosts: &HashSet<String>) -> bool {
    hosts
        .iter()
        .any(|listed| domain == listed || domain.ends_with(&format!(".{listed}")))
}

fn is_localhost(domain: &str) -> bool {
    domain == "localhost" || domain.ends_with(".localhost")
}
