//! avrobind-registry
//!
//! Client-side lookup of Avro schemas in a Confluent-compatible schema
//! registry. Only the `schema` field of the registry's response is used.

pub mod errors;
pub use errors::RegistryError;

mod fetcher;
pub use fetcher::{get, FetcherConfig, SchemaFetcher, SchemaFetcherBuilder, SchemaVersion};
