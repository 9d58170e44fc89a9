use anyhow::{Context, Result};
use avrobind_registry::{SchemaFetcher, SchemaVersion};
use clap::Args;
use std::time::Duration;

#[derive(Debug, Args)]
#[command(after_help = EXAMPLES_TEXT)]
pub struct Fetch {
    #[arg(help = "Schema subject name")]
    pub subject: String,

    #[arg(
        long,
        short = 'r',
        env = "AVROBIND_REGISTRY_URL",
        help = "Base URL of the schema registry"
    )]
    pub registry: String,

    #[arg(long, short = 'v', help = "Specific version (defaults to latest)")]
    pub version: Option<u32>,

    #[arg(
        long,
        default_value_t = 10_000,
        help = "Request timeout in milliseconds"
    )]
    pub timeout_ms: u64,

    #[arg(long, help = "Pretty-print the schema JSON")]
    pub pretty: bool,
}

const EXAMPLES_TEXT: &str = r#"
EXAMPLES:
    # Fetch the latest schema of a subject
    avrobind fetch orders-value --registry http://localhost:8081

    # Fetch version 3, pretty printed
    avrobind fetch orders-value -r http://localhost:8081 --version 3 --pretty
"#;

pub async fn handle_fetch(args: Fetch) -> Result<()> {
    let fetcher = build_fetcher(&args.registry, args.timeout_ms)?;
    let version = args
        .version
        .map(SchemaVersion::Number)
        .unwrap_or_default();

    let schema = fetcher
        .get_version(&args.subject, version)
        .await
        .with_context(|| format!("Failed to fetch schema for subject '{}'", args.subject))?;

    if args.pretty {
        match serde_json::from_str::<serde_json::Value>(&schema) {
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{}", schema),
        }
    } else {
        println!("{}", schema);
    }

    Ok(())
}

pub fn build_fetcher(registry: &str, timeout_ms: u64) -> Result<SchemaFetcher> {
    SchemaFetcher::builder()
        .base_url(registry)
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .context("Failed to create schema fetcher")
}
