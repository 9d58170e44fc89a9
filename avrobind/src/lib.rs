//! avrobind
//!
//! Marshal serde types into binary Avro datums, and back, against a schema
//! supplied as JSON text. Encoding, decoding and schema parsing are done by
//! `apache-avro`; this crate binds model values to the schema and reports
//! failures with the operation that produced them.
//!
//! Field association uses serde attributes:
//! - the schema field name is the Rust field name or `#[serde(rename = "...")]`
//! - `#[serde(skip)]` keeps a field out of both directions
//! - `#[serde(skip_serializing_if = "...")]` omits empty values, which then
//!   bind to the null branch of a nullable union
//! - `Vec<u8>` fields for `bytes` need
//!   `#[serde(with = "apache_avro::serde_avro_bytes")]`, and `[u8; N]` fields
//!   for `fixed` need `apache_avro::serde_avro_fixed`
//!
//! Schema fields the target type does not declare are ignored on decode, and
//! model fields the schema does not declare are ignored on encode. Fields
//! that may be null in the schema should be `Option<_>` or carry
//! `#[serde(default)]` in the target type.

mod binding;

pub mod errors;
pub use errors::{MarshalError, Operation};

mod marshaller;
pub use marshaller::{AvroMarshaller, Marshaller, MarshallerConfig};

mod schema_cache;
pub use schema_cache::{fingerprint, SchemaCache};

mod target;
