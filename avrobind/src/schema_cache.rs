use apache_avro::Schema;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::{Arc, LazyLock};
use tracing::trace;

static GLOBAL_CACHE: LazyLock<SchemaCache> = LazyLock::new(SchemaCache::new);

/// Parsed schemas keyed by the SHA-256 digest of their text.
///
/// Schema text never changes once handed to a marshaller, so an entry can
/// never go stale. Parse failures are not stored and are reported again on
/// the next lookup.
///
/// There is no eviction: every distinct schema text stays cached until
/// [`SchemaCache::clear`] is called. Processes that see an unbounded stream of
/// schemas should turn caching off in `MarshallerConfig` or clear periodically.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: DashMap<String, Arc<Schema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache shared by every caching marshaller.
    pub fn global() -> &'static SchemaCache {
        &GLOBAL_CACHE
    }

    /// Returns the parsed form of `raw_schema`, parsing and storing it on a miss.
    pub fn get_or_parse(&self, raw_schema: &str) -> Result<Arc<Schema>, apache_avro::Error> {
        let key = hex_digest(raw_schema);
        if let Some(schema) = self.entries.get(&key) {
            trace!(key = %key, "schema cache hit");
            return Ok(Arc::clone(schema.value()));
        }

        let parsed = Arc::new(Schema::parse_str(raw_schema)?);
        let schema = self.entries.entry(key).or_insert(parsed);
        Ok(Arc::clone(schema.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Compute the SHA-256 fingerprint of a schema.
///
/// Schemas that parse are hashed in Parsing Canonical Form, so whitespace and
/// attribute order do not change the result. Text that does not parse is
/// hashed as-is.
pub fn fingerprint(raw_schema: &str) -> String {
    let canonical = Schema::parse_str(raw_schema)
        .map(|schema| schema.canonical_form())
        .unwrap_or_else(|_| raw_schema.to_string());
    format!("sha256:{}", hex_digest(&canonical))
}

fn hex_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
