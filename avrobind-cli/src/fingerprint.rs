use anyhow::{Context, Result};
use avrobind::{fingerprint, SchemaCache};
use clap::Args;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct Fingerprint {
    #[arg(long, short = 'f', help = "Path to the Avro schema file")]
    pub schema_file: PathBuf,
}

pub fn handle_fingerprint(args: Fingerprint) -> Result<()> {
    let raw_schema = fs::read_to_string(&args.schema_file)
        .with_context(|| format!("Failed to read schema file: {:?}", args.schema_file))?;

    // reject text that is not a schema instead of fingerprinting it raw
    SchemaCache::global()
        .get_or_parse(&raw_schema)
        .context("Invalid Avro schema")?;

    println!("{}", fingerprint(&raw_schema));
    Ok(())
}
