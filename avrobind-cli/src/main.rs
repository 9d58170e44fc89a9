mod decode;
mod fetch;
mod fingerprint;

use anyhow::Result;
use clap::{Parser, Subcommand};
use decode::Decode;
use fetch::Fetch;
use fingerprint::Fingerprint;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "avrobind")]
#[command(about = "Fetch Avro schemas from a schema registry and decode Avro datums")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Fetch a schema from the schema registry")]
    Fetch(Fetch),

    #[command(about = "Decode a binary Avro datum and print it as JSON")]
    Decode(Decode),

    #[command(about = "Print the SHA-256 fingerprint of a schema file")]
    Fingerprint(Fingerprint),
}

#[tokio::main]
async fn main() -> Result<()> {
    // logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch(fetch) => fetch::handle_fetch(fetch).await?,
        Commands::Decode(decode) => decode::handle_decode(decode).await?,
        Commands::Fingerprint(fingerprint) => fingerprint::handle_fingerprint(fingerprint)?,
    }

    Ok(())
}
