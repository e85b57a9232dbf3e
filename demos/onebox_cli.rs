use clap::{Arg, ArgAction, Command};
use colored::Colorize;
use onebox::{Onebox, OneboxConfig, Resolution};
use std::error::Error;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let matches = Command::new("onebox")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resolve URLs into HTML preview fragments")
        .arg(
            Arg::new("urls")
                .help("URLs to resolve")
                .required(true)
                .num_args(1..),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON configuration file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("deny")
                .short('d')
                .long("deny")
                .help("Never fetch these domains (comma-separated)")
                .value_name("DOMAINS"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .help("Overall budget per URL in seconds")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print previews as JSON")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    #[cfg(feature = "logging")]
    onebox::setup_logging(onebox::LogConfig {
        file_output: false,
        log_level: "warn".into(),
        ..Default::default()
    })?;

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => OneboxConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => OneboxConfig::default(),
    };
    if let Some(domains) = matches.get_one::<String>("deny") {
        for domain in domains.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            config = config.with_denied_host(domain);
        }
    }
    if let Some(seconds) = matches.get_one::<u64>("timeout") {
        config = config.with_resolve_timeout(Duration::from_secs(*seconds));
    }

    let resolver = Onebox::new(config)?;
    let urls: Vec<&String> = matches.get_many::<String>("urls").into_iter().flatten().collect();
    let results = resolver.resolve_batch(&urls).await;

    for (url, resolution) in urls.iter().zip(&results) {
        println!("{}", url.bold());
        match resolution {
            Resolution::Preview(preview) if matches.get_flag("json") => {
                println!("{}", serde_json::to_string_pretty(preview)?);
            }
            Resolution::Preview(preview) => {
                println!("  {} {}", "engine:".green(), preview.engine);
                println!("  {}", preview.full_html);
                if let Some(placeholder) = &preview.placeholder_html {
                    println!("  {} {}", "placeholder:".green(), placeholder);
                }
            }
            Resolution::NoPreview => println!("  {}", "no preview".yellow()),
            Resolution::Rejected => println!("  {}", "rejected".red().bold()),
        }
        #[cfg(feature = "logging")]
        onebox::log_resolution_card(url, resolution);
        println!();
    }

    Ok(())
}
