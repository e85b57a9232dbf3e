//! Turns arbitrary URLs into safe, self-contained HTML preview fragments.
//!
//! ```no_run
//! # async fn run() -> Result<(), onebox::OneboxError> {
//! let onebox = onebox::Onebox::new(onebox::OneboxConfig::default())?;
//! if let Some(html) = onebox.resolve("https://youtu.be/dQw4w9WgXcQ").await.html() {
//!     println!("{html}");
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod error;
mod guard;
#[cfg(feature = "logging")]
mod logging;
mod pipeline;
mod utils;

pub mod engine;
pub mod extract;
pub mod fetcher;
pub mod render;

#[cfg(feature = "cache")]
pub use cache::PreviewCache;
pub use config::{OneboxConfig, DEFAULT_PRIORITIES, MAX_CONCURRENT_RESOLUTIONS};
pub use engine::{Engine, EngineContext, MatchPredicate, Priority, Registry};
pub use error::{FetchFailure, OneboxError};
pub use extract::{ExtractedData, Strategy};
pub use fetcher::{FetchResult, Fetcher, RawResponse, Transport};
pub use guard::{Guard, GuardConfig};
#[cfg(feature = "logging")]
pub use logging::{log_resolution_card, setup_logging, LogConfig};
pub use pipeline::{Onebox, RenderedPreview, Resolution};
pub use render::{Markup, Template};
