use crate::render::truncate_text;
use crate::{OneboxError, Resolution};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: true,
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides `log_level`.
pub fn setup_logging(config: LogConfig) -> Result<(), OneboxError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .pretty();
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir).map_err(|e| {
            OneboxError::Config(format!(
                "cannot create log directory {}: {e}",
                config.log_dir.display()
            ))
        })?;

        let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "onebox.log");
        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_writer(file_appender);
        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| OneboxError::Config(format!("logging already initialized: {e}")))?;

    debug!("Logging initialized with config: {:?}", config);
    Ok(())
}

/// Logs a boxed one-glance summary of a resolution.
pub fn log_resolution_card(url: &str, resolution: &Resolution) {
    const CARD_WIDTH: usize = 78;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 10;

    let (outcome, engine, html) = match resolution {
        Resolution::Preview(preview) => ("preview", preview.engine, preview.full_html.as_str()),
        Resolution::NoPreview => ("no preview", "-", ""),
        Resolution::Rejected => ("rejected", "-", ""),
    };
    let line = "═".repeat(CARD_WIDTH);

    info!(
        "\n╔{line}╗\n URL:     {}\n Outcome: {}\n Engine:  {}\n HTML:    {}\n╚{line}╝",
        truncate_text(url, CONTENT_WIDTH),
        outcome,
        engine,
        truncate_text(html, CONTENT_WIDTH),
    );
}
