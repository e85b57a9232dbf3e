#![allow(dead_code)]

use async_trait::async_trait;
use onebox::{FetchFailure, Onebox, OneboxConfig, RawResponse, Transport};
use reqwest::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::Method;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// In-memory transport. Unrouted requests get a 404; every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<(Method, String), RawResponse>,
    requests: Mutex<Vec<(Method, String)>>,
    delay: Option<Duration>,
}

fn response(status: u16, content_type: &str, body: &str) -> RawResponse {
    let mut response = RawResponse::new(status);
    if let Ok(value) = HeaderValue::from_str(content_type) {
        response.headers.insert(CONTENT_TYPE, value);
    }
    response.body = body.as_bytes().to_vec();
    response
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every response is delayed by `delay` of (possibly paused) tokio time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn route(mut self, method: Method, url: &str, response: RawResponse) -> Self {
        self.routes.insert((method, url.to_string()), response);
        self
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.route(Method::GET, url, response(200, "text/html; charset=utf-8", body))
    }

    pub fn json(self, url: &str, body: &str) -> Self {
        self.route(Method::GET, url, response(200, "application/json", body))
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.route(Method::GET, url, RawResponse::new(status))
    }

    /// Answers HEAD (and GET) with an empty body of the given type.
    pub fn content_type(self, url: &str, content_type: &str) -> Self {
        self.route(Method::HEAD, url, response(200, content_type, ""))
            .route(Method::GET, url, response(200, content_type, ""))
    }

    /// A 302 for both HEAD and GET.
    pub fn redirect(self, url: &str, location: &str) -> Self {
        let mut redirect = RawResponse::new(302);
        if let Ok(value) = HeaderValue::from_str(location) {
            redirect.headers.insert(LOCATION, value);
        }
        self.route(Method::HEAD, url, redirect.clone())
            .route(Method::GET, url, redirect)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(method, url)| format!("{method} {url}"))
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// True if any request, with any method, went to a URL starting with `prefix`.
    pub fn was_requested(&self, prefix: &str) -> bool {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .any(|(_, url)| url.starts_with(prefix))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, method: Method, url: &Url) -> Result<RawResponse, FetchFailure> {
        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), url.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .routes
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or_else(|| RawResponse::new(404)))
    }
}

pub fn resolver(transport: &Arc<MockTransport>) -> Onebox {
    resolver_with(OneboxConfig::default(), transport)
}

pub fn resolver_with(config: OneboxConfig, transport: &Arc<MockTransport>) -> Onebox {
    let transport: Arc<dyn Transport> = transport.clone();
    Onebox::with_transport(config, transport).expect("default engines build")
}

pub const YOUTUBE_OEMBED: &str =
    "https://www.youtube.com/oembed?format=json&url=https%3A%2F%2Fyoutu.be%2FdQw4w9WgXcQ";

pub const YOUTUBE_OEMBED_BODY: &str = r#"{
    "type": "video",
    "version": "1.0",
    "title": "Rick Astley - Never Gonna Give You Up",
    "provider_name": "YouTube",
    "width": 480,
    "height": 360,
    "thumbnail_url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg",
    "html": "<iframe width=\"480\" height=\"360\" src=\"https://www.youtube.com/embed/dQw4w9WgXcQ?feature=oembed\" frameborder=\"0\" allowfullscreen></iframe>"
}"#;
