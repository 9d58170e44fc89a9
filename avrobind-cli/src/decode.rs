use anyhow::{bail, Context, Result};
use avrobind::AvroMarshaller;
use clap::{ArgGroup, Args, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::fetch::build_fetcher;

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("schema_source")
        .required(true)
        .args(["schema_file", "subject"])
))]
#[command(after_help = EXAMPLES_TEXT)]
pub struct Decode {
    #[arg(long, short = 'i', help = "Path to the binary Avro datum")]
    pub input: PathBuf,

    #[arg(long, short = 'f', help = "Path to the Avro schema file")]
    pub schema_file: Option<PathBuf>,

    #[arg(
        long,
        short = 's',
        requires = "registry",
        help = "Subject whose latest schema is used"
    )]
    pub subject: Option<String>,

    #[arg(
        long,
        short = 'r',
        env = "AVROBIND_REGISTRY_URL",
        help = "Base URL of the schema registry"
    )]
    pub registry: Option<String>,

    #[arg(
        long,
        default_value_t = 10_000,
        help = "Registry request timeout in milliseconds"
    )]
    pub timeout_ms: u64,

    #[arg(
        long,
        short = 'o',
        value_enum,
        default_value = "json",
        help = "Output format"
    )]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

const EXAMPLES_TEXT: &str = r#"
EXAMPLES:
    # Decode with a local schema file
    avrobind decode --input ./order.avro --schema-file ./schemas/order.avsc

    # Decode with the latest registered schema
    avrobind decode -i ./order.avro --subject orders-value --registry http://localhost:8081

NOTES:
    - The input is a single Avro datum with no container header or framing
    - Fields holding null are left out of the JSON output
    - Bytes and fixed values are printed as arrays of numbers
"#;

pub async fn handle_decode(args: Decode) -> Result<()> {
    let schema = match (&args.schema_file, &args.subject, &args.registry) {
        (Some(path), _, _) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {:?}", path))?,
        (None, Some(subject), Some(registry)) => build_fetcher(registry, args.timeout_ms)?
            .get(subject)
            .await
            .with_context(|| format!("Failed to fetch schema for subject '{}'", subject))?,
        _ => bail!("either --schema-file or --subject with --registry is required"),
    };

    let data = fs::read(&args.input)
        .with_context(|| format!("Failed to read input file: {:?}", args.input))?;
    debug!(bytes = data.len(), "decoding avro datum");

    let datum = AvroMarshaller::new(schema)
        .unmarshal_value(&data)
        .context("Failed to decode Avro datum")?;
    // bytes and fixed come out as arrays of numbers
    let value = serde_json::Value::try_from(datum).context("Failed to convert Avro datum to JSON")?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&value)?),
        OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(&value)?),
    }

    Ok(())
}
