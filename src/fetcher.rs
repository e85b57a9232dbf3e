use crate::error::FetchFailure;
use crate::guard::Guard;
use crate::{OneboxConfig, OneboxError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// A single HTTP exchange, before any redirect handling.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

/// One request, one response. Implementations must not follow redirects.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, method: Method, url: &Url) -> Result<RawResponse, FetchFailure>;
}

#[derive(Debug, Clone)]
pub enum FetchResult {
    Success {
        status: u16,
        body: Vec<u8>,
        headers: HeaderMap,
        final_url: Url,
    },
    Redirect {
        location: Url,
    },
    Failure {
        reason: FetchFailure,
    },
}

impl FetchResult {
    pub fn failure(reason: FetchFailure) -> Self {
        FetchResult::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    /// Turns the result into a [`Fetched`] document, treating anything else as an error.
    pub fn into_fetched(self) -> Result<Fetched, OneboxError> {
        match self {
            FetchResult::Success {
                status,
                body,
                headers,
                final_url,
            } => Ok(Fetched {
                status,
                body,
                headers,
                final_url,
            }),
            FetchResult::Redirect { .. } => Err(FetchFailure::TooManyRedirects.into()),
            FetchResult::Failure { reason } => Err(reason.into()),
        }
    }
}

/// A successful response after redirects.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: HeaderMap,
    pub final_url: Url,
}

impl Fetched {
    /// The media type without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        content_type(&self.headers)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub headers: Option<HeaderMap>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::from(&OneboxConfig::default())
    }
}

impl From<&OneboxConfig> for FetcherConfig {
    fn from(config: &OneboxConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.fetch_timeout(),
            max_body_bytes: config.max_body_bytes,
            headers: None,
        }
    }
}

/// [`Transport`] backed by a reqwest client with redirects disabled.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    max_body_bytes: usize,
}

impl ReqwestTransport {
    pub fn new(config: FetcherConfig) -> Result<Self, OneboxError> {
        let headers = config.headers.unwrap_or_else(default_headers);

        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(10)
            .default_headers(headers)
            .build()
            .map_err(|e| OneboxError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub fn with_client(client: Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
        }
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

fn map_reqwest_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::NetworkError(e.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, method: Method, url: &Url) -> Result<RawResponse, FetchFailure> {
        let is_head = method == Method::HEAD;
        let mut response = self
            .client
            .request(method, url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let mut body = Vec::new();

        if !is_head {
            while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
                let room = self.max_body_bytes.saturating_sub(body.len());
                if chunk.len() >= room {
                    body.extend_from_slice(&chunk[..room]);
                    debug!(url = %url, limit = self.max_body_bytes, "Body truncated at size limit");
                    break;
                }
                body.extend_from_slice(&chunk);
            }
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Follows redirects over a [`Transport`], consulting the guard before every hop.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    guard: Arc<Guard>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, guard: Arc<Guard>) -> Self {
        Self { transport, guard }
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// GET `url`, following at most `max_redirects` hops within `timeout`.
    pub async fn fetch(&self, url: &Url, max_redirects: u8, timeout: Duration) -> FetchResult {
        self.request(Method::GET, url, max_redirects, timeout).await
    }

    pub async fn head(&self, url: &Url, max_redirects: u8, timeout: Duration) -> FetchResult {
        self.request(Method::HEAD, url, max_redirects, timeout).await
    }

    /// Dropping the returned future cancels the in-flight request.
    #[instrument(level = "debug", skip(self))]
    pub async fn request(
        &self,
        method: Method,
        url: &Url,
        max_redirects: u8,
        timeout: Duration,
    ) -> FetchResult {
        if timeout.is_zero() {
            return FetchResult::failure(FetchFailure::Timeout);
        }
        match tokio::time::timeout(timeout, self.follow(method, url, max_redirects)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %url, ?timeout, "Fetch timed out");
                FetchResult::failure(FetchFailure::Timeout)
            }
        }
    }

    async fn follow(&self, method: Method, url: &Url, max_redirects: u8) -> FetchResult {
        let mut current = url.clone();
        let mut remaining = max_redirects;

        loop {
            match self.fetch_once(method.clone(), &current).await {
                FetchResult::Redirect { location } => {
                    if remaining == 0 {
                        debug!(url = %url, "Redirect limit exceeded");
                        return FetchResult::failure(FetchFailure::TooManyRedirects);
                    }
                    remaining -= 1;
                    debug!(from = %current, to = %location, "Following redirect");
                    current = location;
                }
                other => return other,
            }
        }
    }

    /// Performs exactly one hop. Redirects are reported, not followed.
    pub async fn fetch_once(&self, method: Method, url: &Url) -> FetchResult {
        if let Err(e) = self.guard.check_url(url) {
            debug!(url = %url, error = %e, "Guard refused fetch");
            let host = url.host_str().unwrap_or_default().to_string();
            return FetchResult::failure(FetchFailure::Rejected(host));
        }

        let response = match self.transport.send(method, url).await {
            Ok(response) => response,
            Err(reason) => return FetchResult::failure(reason),
        };

        if REDIRECT_STATUSES.contains(&response.status) {
            let location = response
                .headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| url.join(v.trim()).ok());
            return match location {
                Some(location) => FetchResult::Redirect { location },
                None => FetchResult::failure(FetchFailure::NonSuccessStatus(response.status)),
            };
        }

        if !(200..300).contains(&response.status) {
            debug!(url = %url, status = response.status, "Non-success status");
            return FetchResult::failure(FetchFailure::NonSuccessStatus(response.status));
        }

        debug!(url = %url, bytes = response.body.len(), "Fetched");
        FetchResult::Success {
            status: response.status,
            body: response.body,
            headers: response.headers,
            final_url: url.clone(),
        }
    }
}
