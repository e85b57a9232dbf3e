use thiserror::Error;
use tracing::{debug, error, warn};

/// Why a single fetch did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("server answered with status {0}")]
    NonSuccessStatus(u16),

    #[error("refused to fetch host {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum OneboxError {
    #[error("Failed to parse URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("URL rejected by guard: {0}")]
    GuardRejected(String),

    #[error("Failed to fetch content: {0}")]
    Fetch(FetchFailure),

    #[error("Malformed content: {0}")]
    Extraction(String),

    #[error("Failed to render preview: {0}")]
    Render(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Engine {0} panicked")]
    EnginePanicked(&'static str),
}

impl From<FetchFailure> for OneboxError {
    fn from(failure: FetchFailure) -> Self {
        match failure {
            FetchFailure::Rejected(host) => OneboxError::GuardRejected(host),
            other => OneboxError::Fetch(other),
        }
    }
}

impl OneboxError {
    /// Guard rejections are final; everything else may be retried with the fallback engine.
    pub fn is_rejection(&self) -> bool {
        matches!(self, OneboxError::GuardRejected(_))
    }

    pub fn log(&self) {
        match self {
            OneboxError::UrlParse(e) => {
                debug!(error = %e, "URL parsing failed");
            }
            OneboxError::GuardRejected(host) => {
                debug!(host = %host, "URL rejected by guard");
            }
            OneboxError::Fetch(failure) => {
                warn!(error = %failure, "Content fetch failed");
            }
            OneboxError::Extraction(e) => {
                debug!(error = %e, "Content could not be extracted");
            }
            OneboxError::Render(e) => {
                warn!(error = %e, "Preview rendering failed");
            }
            OneboxError::Config(e) => {
                error!(error = %e, "Invalid onebox configuration");
            }
            OneboxError::EnginePanicked(engine) => {
                error!(engine = %engine, "Engine panicked during resolution");
            }
        }
    }
}
