use apache_avro::types::Value;
use apache_avro::Schema;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::{
    binding::{self, Binder},
    errors::{MarshalError, Operation, Result},
    schema_cache::SchemaCache,
    target,
};

/// Encodes models into binary Avro and decodes them back.
pub trait Marshaller {
    /// Encode `model` into a binary Avro datum.
    fn marshal<T>(&self, model: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized;

    /// Decode a binary Avro datum into a new `T`.
    fn unmarshal<T>(&self, data: &[u8]) -> Result<T>
    where
        T: DeserializeOwned;

    /// Decode a binary Avro datum into `model`.
    ///
    /// `model` is only overwritten when decoding succeeds.
    fn unmarshal_into<T>(&self, data: &[u8], model: &mut T) -> Result<()>
    where
        T: DeserializeOwned,
    {
        *model = self.unmarshal(data)?;
        Ok(())
    }
}

/// Options for an [`AvroMarshaller`].
#[derive(Debug, Clone)]
pub struct MarshallerConfig {
    /// Reuse parsed schemas from the process-wide [`SchemaCache`]. When off,
    /// the schema text is parsed again on every call.
    pub cache_schemas: bool,
}

impl Default for MarshallerConfig {
    fn default() -> Self {
        Self {
            cache_schemas: true,
        }
    }
}

/// A [`Marshaller`] bound to one Avro schema.
///
/// The schema text is not validated on construction. A malformed schema is
/// reported by the first `marshal` or `unmarshal` call.
///
/// # Example
///
/// ```
/// use avrobind::{AvroMarshaller, Marshaller};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
/// struct Presenter {
///     email: String,
/// }
///
/// let marshaller = AvroMarshaller::new(
///     r#"{"type":"record","name":"presenter","fields":[{"name":"email","type":"string"}]}"#,
/// );
/// let presenter = Presenter { email: "someone@example.com".into() };
///
/// let bytes = marshaller.marshal(&presenter)?;
/// let decoded: Presenter = marshaller.unmarshal(&bytes)?;
/// assert_eq!(decoded, presenter);
/// # Ok::<(), avrobind::MarshalError>(())
/// ```
#[derive(Debug, Clone)]
pub struct AvroMarshaller {
    schema: String,
    config: MarshallerConfig,
}

impl AvroMarshaller {
    pub fn new(schema: impl Into<String>) -> Self {
        Self::with_config(schema, MarshallerConfig::default())
    }

    pub fn with_config(schema: impl Into<String>, config: MarshallerConfig) -> Self {
        Self {
            schema: schema.into(),
            config,
        }
    }

    /// The raw schema text this marshaller was built with.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn config(&self) -> &MarshallerConfig {
        &self.config
    }

    /// Decode a binary Avro datum into the codec's own value tree.
    ///
    /// Record fields holding null are dropped, as they are before
    /// [`Marshaller::unmarshal`] hands the datum to serde. Bytes and fixed
    /// values stay as they are, so the result can be converted with
    /// `serde_json::Value::try_from` where serde_json's own deserializer
    /// would reject byte arrays.
    pub fn unmarshal_value(&self, data: &[u8]) -> Result<Value> {
        let schema = self.parsed_schema(Operation::Unmarshal)?;

        let mut reader = data;
        let datum = apache_avro::from_avro_datum(&schema, &mut reader, None)
            .map_err(|e| MarshalError::Decoding(e.to_string()))?;
        if !reader.is_empty() {
            debug!(
                trailing = reader.len(),
                "ignoring trailing bytes after avro datum"
            );
        }

        Ok(binding::normalise(datum))
    }

    fn parsed_schema(&self, operation: Operation) -> Result<Arc<Schema>> {
        let parsed = if self.config.cache_schemas {
            SchemaCache::global().get_or_parse(&self.schema)
        } else {
            Schema::parse_str(&self.schema).map(Arc::new)
        };

        parsed.map_err(|source| MarshalError::SchemaParse { operation, source })
    }
}

impl Marshaller for AvroMarshaller {
    fn marshal<T>(&self, model: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let schema = self.parsed_schema(Operation::Marshal)?;

        let value =
            apache_avro::to_value(model).map_err(|e| MarshalError::Encoding(e.to_string()))?;
        let bound = Binder::new(&schema)
            .and_then(|binder| binder.bind(value))
            .map_err(|e| MarshalError::Encoding(e.to_string()))?;

        let bytes = apache_avro::to_avro_datum(&schema, bound)
            .map_err(|e| MarshalError::Encoding(e.to_string()))?;

        trace!(bytes = bytes.len(), "marshalled avro datum");
        Ok(bytes)
    }

    fn unmarshal<T>(&self, data: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let datum = self.unmarshal_value(data)?;
        target::check_target::<T>(&datum)?;

        let model =
            apache_avro::from_value::<T>(&datum).map_err(|e| MarshalError::Decoding(e.to_string()))?;
        trace!(bytes = data.len(), "unmarshalled avro datum");
        Ok(model)
    }
}
