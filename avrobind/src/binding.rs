//! Binds serde-produced Avro values to a parsed schema before encoding, and
//! normalises decoded values before they are handed back to serde.
//!
//! The codec's serializer names record fields after the Rust fields (or their
//! `#[serde(rename)]`), skips `#[serde(skip)]` fields entirely and omits fields
//! rejected by `skip_serializing_if`. Binding turns that loosely shaped value
//! into one that matches the schema exactly:
//! - record fields come out in schema order, extra value fields are dropped
//! - a missing field falls back to its default, then to the null branch
//! - union values are tagged with the branch they bind to
//! - primitives only widen (`int` into `long`), never narrow

use apache_avro::schema::{Name, RecordField, RecordSchema, ResolvedSchema, UnionSchema};
use apache_avro::types::Value;
use apache_avro::Schema;
use std::collections::HashMap;
use std::fmt;

// a plain Vec<u8> serializes as a sequence of ints and would not decode back
const UNTAGGED_BYTES: &str = "expected bytes, found array; annotate Vec<u8> fields with \
     #[serde(with = \"apache_avro::serde_avro_bytes\")]";

/// Where in the datum a binding failure happened, e.g. `presenter.email`.
#[derive(Debug, Clone, Default)]
struct FieldPath(String);

impl FieldPath {
    fn field(&self, name: &str) -> FieldPath {
        if self.0.is_empty() {
            FieldPath(name.to_string())
        } else {
            FieldPath(format!("{}.{}", self.0, name))
        }
    }

    fn index(&self, index: usize) -> FieldPath {
        FieldPath(format!("{}[{}]", self.0, index))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

#[derive(Debug)]
pub(crate) struct BindError {
    path: FieldPath,
    reason: String,
}

impl BindError {
    fn new(path: &FieldPath, reason: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    fn mismatch(path: &FieldPath, expected: &str, found: &Value) -> Self {
        Self::new(
            path,
            format!("expected {}, found {}", expected, value_kind(found)),
        )
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field `{}`: {}", self.path, self.reason)
    }
}

impl std::error::Error for BindError {}

pub(crate) struct Binder<'s> {
    root: &'s Schema,
    names: HashMap<Name, &'s Schema>,
}

impl<'s> Binder<'s> {
    pub(crate) fn new(root: &'s Schema) -> Result<Self, BindError> {
        let resolved = ResolvedSchema::try_from(root).map_err(|e| {
            BindError::new(&FieldPath::default(), format!("unresolved schema name: {}", e))
        })?;
        Ok(Self {
            root,
            names: resolved.get_names().clone(),
        })
    }

    /// Bind `value` against the root schema.
    pub(crate) fn bind(&self, value: Value) -> Result<Value, BindError> {
        self.bind_at(value, self.root, &FieldPath::default())
    }

    fn bind_at(&self, value: Value, schema: &Schema, path: &FieldPath) -> Result<Value, BindError> {
        // Option<T> serializes as a union; outside a union schema only the payload matters
        let value = match (schema, value) {
            (Schema::Union(_) | Schema::Ref { .. }, value) => value,
            (_, Value::Union(_, inner)) => *inner,
            (_, value) => value,
        };

        match schema {
            Schema::Ref { name } => self.bind_at(value, self.lookup(name, path)?, path),
            Schema::Union(union) => self.bind_union(value, union, path),
            Schema::Record(record) => self.bind_record(value, record, path),
            Schema::Array(array) => match value {
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.bind_at(item, &array.items, &path.index(i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                other => Err(BindError::mismatch(path, "array", &other)),
            },
            Schema::Map(map) => {
                let entries: Vec<(String, Value)> = match value {
                    Value::Map(entries) => entries.into_iter().collect(),
                    Value::Record(fields) => fields,
                    other => return Err(BindError::mismatch(path, "map", &other)),
                };
                entries
                    .into_iter()
                    .map(|(key, item)| {
                        let bound = self.bind_at(item, &map.types, &path.field(&key))?;
                        Ok((key, bound))
                    })
                    .collect::<Result<HashMap<_, _>, _>>()
                    .map(Value::Map)
            }
            Schema::Enum(enum_schema) => match value {
                Value::Enum(_, symbol) | Value::String(symbol) => {
                    match enum_schema.symbols.iter().position(|s| *s == symbol) {
                        Some(index) => Ok(Value::Enum(index as u32, symbol)),
                        None => Err(BindError::new(
                            path,
                            format!("`{}` is not a symbol of enum {}", symbol, enum_schema.name),
                        )),
                    }
                }
                other => Err(BindError::mismatch(path, "enum symbol", &other)),
            },
            Schema::Fixed(fixed) => match value {
                Value::Fixed(size, bytes) if size == fixed.size => Ok(Value::Fixed(size, bytes)),
                Value::Fixed(_, bytes) | Value::Bytes(bytes) if bytes.len() != fixed.size => {
                    Err(BindError::new(
                        path,
                        format!("expected {} bytes, found {}", fixed.size, bytes.len()),
                    ))
                }
                Value::Bytes(bytes) => Ok(Value::Fixed(fixed.size, bytes)),
                Value::Array(_) => Err(BindError::new(path, UNTAGGED_BYTES)),
                other => Err(BindError::mismatch(
                    path,
                    &format!("fixed({})", fixed.size),
                    &other,
                )),
            },
            Schema::Null
            | Schema::Boolean
            | Schema::Int
            | Schema::Long
            | Schema::Float
            | Schema::Double
            | Schema::Bytes
            | Schema::String => bind_primitive(value, schema, path),
            // logical types keep the codec's own conversion rules
            logical => value
                .resolve(logical)
                .map_err(|e| BindError::new(path, e.to_string())),
        }
    }

    fn bind_union(
        &self,
        value: Value,
        union: &UnionSchema,
        path: &FieldPath,
    ) -> Result<Value, BindError> {
        let value = match value {
            Value::Union(_, inner) => *inner,
            other => other,
        };

        if let Value::Null = value {
            return self.null_branch(union).ok_or_else(|| {
                BindError::new(path, "null is not a branch of this union")
            });
        }

        // an exact primitive branch wins over one the value only widens into
        let exact = union
            .variants()
            .iter()
            .position(|variant| is_primitive(variant) && schema_kind(variant) == value_kind(&value));
        if let Some(index) = exact {
            let bound = bind_primitive(value, &union.variants()[index], path)?;
            return Ok(Value::Union(index as u32, Box::new(bound)));
        }

        for (index, variant) in union.variants().iter().enumerate() {
            if matches!(variant, Schema::Null) {
                continue;
            }
            if let Ok(bound) = self.bind_at(value.clone(), variant, path) {
                return Ok(Value::Union(index as u32, Box::new(bound)));
            }
        }

        Err(BindError::mismatch(path, "a union branch", &value))
    }

    fn bind_record(
        &self,
        value: Value,
        record: &RecordSchema,
        path: &FieldPath,
    ) -> Result<Value, BindError> {
        let mut supplied: HashMap<String, Value> = match value {
            Value::Record(fields) => fields.into_iter().collect(),
            Value::Map(entries) => entries,
            other => return Err(BindError::mismatch(path, "record", &other)),
        };

        let mut bound = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let field_path = path.field(&field.name);
            let value = match supplied.remove(&field.name) {
                Some(value) => self.bind_at(value, &field.schema, &field_path)?,
                None => self.absent_field(field, &field_path)?,
            };
            bound.push((field.name.clone(), value));
        }

        Ok(Value::Record(bound))
    }

    /// Value for a schema field the model did not supply.
    fn absent_field(&self, field: &RecordField, path: &FieldPath) -> Result<Value, BindError> {
        let schema = self.deref(&field.schema, path)?;

        if let Some(default) = &field.default {
            return Value::from(default.clone())
                .resolve(schema)
                .map_err(|e| BindError::new(path, format!("invalid default: {}", e)));
        }

        match schema {
            Schema::Union(union) => self
                .null_branch(union)
                .ok_or_else(|| BindError::new(path, "missing required field")),
            _ => Err(BindError::new(path, "missing required field")),
        }
    }

    fn null_branch(&self, union: &UnionSchema) -> Option<Value> {
        union
            .variants()
            .iter()
            .position(|variant| matches!(variant, Schema::Null))
            .map(|index| Value::Union(index as u32, Box::new(Value::Null)))
    }

    fn deref<'a>(&'a self, schema: &'a Schema, path: &FieldPath) -> Result<&'a Schema, BindError> {
        match schema {
            Schema::Ref { name } => self.lookup(name, path),
            other => Ok(other),
        }
    }

    fn lookup(&self, name: &Name, path: &FieldPath) -> Result<&'s Schema, BindError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| BindError::new(path, format!("unknown named type {}", name)))
    }
}

fn bind_primitive(value: Value, schema: &Schema, path: &FieldPath) -> Result<Value, BindError> {
    let bound = match (schema, value) {
        (Schema::Null, Value::Null) => Value::Null,
        (Schema::Boolean, Value::Boolean(b)) => Value::Boolean(b),
        (Schema::Int, Value::Int(n)) => Value::Int(n),
        (Schema::Long, Value::Int(n)) => Value::Long(i64::from(n)),
        (Schema::Long, Value::Long(n)) => Value::Long(n),
        (Schema::Float, Value::Int(n)) => Value::Float(n as f32),
        (Schema::Float, Value::Long(n)) => Value::Float(n as f32),
        (Schema::Float, Value::Float(x)) => Value::Float(x),
        (Schema::Double, Value::Int(n)) => Value::Double(f64::from(n)),
        (Schema::Double, Value::Long(n)) => Value::Double(n as f64),
        (Schema::Double, Value::Float(x)) => Value::Double(f64::from(x)),
        (Schema::Double, Value::Double(x)) => Value::Double(x),
        (Schema::String, Value::String(s)) => Value::String(s),
        (Schema::Bytes, Value::Bytes(bytes)) => Value::Bytes(bytes),
        (Schema::Bytes, Value::String(s)) => Value::Bytes(s.into_bytes()),
        (Schema::Bytes, Value::Array(_)) => return Err(BindError::new(path, UNTAGGED_BYTES)),
        (schema, other) => {
            return Err(BindError::mismatch(path, schema_kind(schema), &other));
        }
    };
    Ok(bound)
}

/// Drop null-branch record fields so serde falls back to `Option::None` or
/// the field's `#[serde(default)]`.
pub(crate) fn normalise(value: Value) -> Value {
    match value {
        Value::Record(fields) => Value::Record(
            fields
                .into_iter()
                .filter(|(_, field)| !is_null(field))
                .map(|(name, field)| (name, normalise(field)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalise).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(key, item)| (key, normalise(item)))
                .collect(),
        ),
        Value::Union(index, inner) => Value::Union(index, Box::new(normalise(*inner))),
        other => other,
    }
}

fn is_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Union(_, inner) => matches!(**inner, Value::Null),
        _ => false,
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) => "int",
        Value::Long(_) => "long",
        Value::Float(_) => "float",
        Value::Double(_) => "double",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "string",
        Value::Fixed(..) => "fixed",
        Value::Enum(..) => "enum",
        Value::Union(_, inner) => value_kind(inner),
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Record(_) => "record",
        _ => "logical value",
    }
}

fn is_primitive(schema: &Schema) -> bool {
    matches!(
        schema,
        Schema::Null
            | Schema::Boolean
            | Schema::Int
            | Schema::Long
            | Schema::Float
            | Schema::Double
            | Schema::Bytes
            | Schema::String
    )
}

fn schema_kind(schema: &Schema) -> &'static str {
    match schema {
        Schema::Null => "null",
        Schema::Boolean => "boolean",
        Schema::Int => "int",
        Schema::Long => "long",
        Schema::Float => "float",
        Schema::Double => "double",
        Schema::Bytes => "bytes",
        Schema::String => "string",
        _ => "complex type",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Schema {
        Schema::parse_str(raw).unwrap()
    }

    fn record(fields: &[(&str, Value)]) -> Value {
        Value::Record(
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_record_fields_follow_schema_order_and_drop_extras() {
        let schema = parse(
            r#"{"type":"record","name":"Team","fields":[
                {"name":"manager","type":"string"},
                {"name":"players","type":"int"}
            ]}"#,
        );
        let value = record(&[
            ("players", Value::Int(11)),
            ("mascot", Value::String("Gunnersaurus".into())),
            ("manager", Value::String("Arteta".into())),
        ]);

        let bound = Binder::new(&schema).unwrap().bind(value).unwrap();
        assert_eq!(
            bound,
            record(&[
                ("manager", Value::String("Arteta".into())),
                ("players", Value::Int(11)),
            ])
        );
    }

    #[test]
    fn test_long_does_not_narrow_into_int() {
        let schema = parse(r#"{"type":"record","name":"Score","fields":[{"name":"goals","type":"int"}]}"#);
        let err = Binder::new(&schema)
            .unwrap()
            .bind(record(&[("goals", Value::Long(10))]))
            .unwrap_err();

        assert_eq!(err.to_string(), "field `goals`: expected int, found long");
    }

    #[test]
    fn test_int_widens_into_long_and_double() {
        let schema = parse(
            r#"{"type":"record","name":"Stats","fields":[
                {"name":"total","type":"long"},
                {"name":"ratio","type":"double"}
            ]}"#,
        );
        let bound = Binder::new(&schema)
            .unwrap()
            .bind(record(&[("total", Value::Int(3)), ("ratio", Value::Int(2))]))
            .unwrap();

        assert_eq!(
            bound,
            record(&[("total", Value::Long(3)), ("ratio", Value::Double(2.0))])
        );
    }

    #[test]
    fn test_missing_nullable_field_takes_null_branch() {
        let schema = parse(
            r#"{"type":"record","name":"Team","fields":[{"name":"manager","type":["null","string"]}]}"#,
        );
        let bound = Binder::new(&schema).unwrap().bind(record(&[])).unwrap();

        assert_eq!(
            bound,
            record(&[("manager", Value::Union(0, Box::new(Value::Null)))])
        );
    }

    #[test]
    fn test_missing_field_uses_schema_default() {
        let schema = parse(
            r#"{"type":"record","name":"Team","fields":[{"name":"sport","type":"string","default":"Football"}]}"#,
        );
        let bound = Binder::new(&schema).unwrap().bind(record(&[])).unwrap();

        assert_eq!(bound, record(&[("sport", Value::String("Football".into()))]));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let schema = parse(r#"{"type":"record","name":"Team","fields":[{"name":"owner","type":"string"}]}"#);
        let err = Binder::new(&schema).unwrap().bind(record(&[])).unwrap_err();

        assert_eq!(err.to_string(), "field `owner`: missing required field");
    }

    #[test]
    fn test_option_some_binds_to_matching_branch() {
        let schema = parse(r#"["null","int","string"]"#);
        let value = Value::Union(1, Box::new(Value::String("x".into())));
        let bound = Binder::new(&schema).unwrap().bind(value).unwrap();

        assert_eq!(bound, Value::Union(2, Box::new(Value::String("x".into()))));
    }

    #[test]
    fn test_union_prefers_exact_branch_over_widening() {
        let schema = parse(r#"["long","int"]"#);
        let binder = Binder::new(&schema).unwrap();

        assert_eq!(
            binder.bind(Value::Int(5)).unwrap(),
            Value::Union(1, Box::new(Value::Int(5)))
        );
        assert_eq!(
            binder.bind(Value::Long(5)).unwrap(),
            Value::Union(0, Box::new(Value::Long(5)))
        );
    }

    #[test]
    fn test_union_falls_back_to_widening() {
        let schema = parse(r#"["null","string","double"]"#);
        let bound = Binder::new(&schema).unwrap().bind(Value::Int(2)).unwrap();

        assert_eq!(bound, Value::Union(2, Box::new(Value::Double(2.0))));
    }

    #[test]
    fn test_int_sequence_is_not_bytes() {
        let schema = parse(
            r#"{"type":"record","name":"Blob","fields":[
                {"name":"data","type":"bytes"},
                {"name":"digest","type":{"type":"fixed","name":"Digest","size":2}}
            ]}"#,
        );
        let binder = Binder::new(&schema).unwrap();
        let ints = Value::Array(vec![Value::Int(1), Value::Int(2)]);

        let err = binder
            .bind(record(&[("data", ints.clone()), ("digest", Value::Bytes(vec![1, 2]))]))
            .unwrap_err();
        assert!(err.to_string().starts_with("field `data`: expected bytes, found array"));
        assert!(err.to_string().contains("serde_avro_bytes"));

        let err = binder
            .bind(record(&[("data", Value::Bytes(vec![9])), ("digest", ints)]))
            .unwrap_err();
        assert!(err.to_string().starts_with("field `digest`: expected bytes"));
    }

    #[test]
    fn test_fixed_size_must_match() {
        let schema = parse(r#"{"type":"fixed","name":"Digest","size":2}"#);
        let binder = Binder::new(&schema).unwrap();

        assert_eq!(
            binder.bind(Value::Fixed(2, vec![1, 2])).unwrap(),
            Value::Fixed(2, vec![1, 2])
        );
        assert_eq!(
            binder.bind(Value::Bytes(vec![1, 2])).unwrap(),
            Value::Fixed(2, vec![1, 2])
        );
        let err = binder.bind(Value::Fixed(3, vec![1, 2, 3])).unwrap_err();
        assert_eq!(err.to_string(), "field `<root>`: expected 2 bytes, found 3");
    }

    #[test]
    fn test_enum_accepts_symbol_string() {
        let schema = parse(r#"{"type":"enum","name":"Suit","symbols":["SPADES","HEARTS"]}"#);
        let binder = Binder::new(&schema).unwrap();

        assert_eq!(
            binder.bind(Value::String("HEARTS".into())).unwrap(),
            Value::Enum(1, "HEARTS".into())
        );
        assert!(binder.bind(Value::String("CLUBS".into())).is_err());
    }

    #[test]
    fn test_named_reference_resolves() {
        let schema = parse(
            r#"{"type":"record","name":"Match","fields":[
                {"name":"home","type":{"type":"record","name":"Club","fields":[{"name":"name","type":"string"}]}},
                {"name":"away","type":"Club"}
            ]}"#,
        );
        let club = |name: &str| record(&[("name", Value::String(name.into()))]);
        let bound = Binder::new(&schema)
            .unwrap()
            .bind(record(&[("home", club("Leeds")), ("away", club("York"))]))
            .unwrap();

        assert_eq!(bound, record(&[("home", club("Leeds")), ("away", club("York"))]));
    }

    #[test]
    fn test_error_path_points_into_arrays() {
        let schema = parse(
            r#"{"type":"record","name":"Filing","fields":[
                {"name":"items","type":{"type":"array","items":{"type":"record","name":"Item","fields":[{"name":"id","type":"string"}]}}}
            ]}"#,
        );
        let items = Value::Array(vec![
            record(&[("id", Value::String("a".into()))]),
            record(&[("id", Value::Int(2))]),
        ]);
        let err = Binder::new(&schema)
            .unwrap()
            .bind(record(&[("items", items)]))
            .unwrap_err();

        assert_eq!(err.to_string(), "field `items[1].id`: expected string, found int");
    }

    #[test]
    fn test_normalise_drops_null_fields_recursively() {
        let value = record(&[
            ("a", Value::Union(0, Box::new(Value::Null))),
            (
                "b",
                Value::Array(vec![record(&[
                    ("c", Value::Null),
                    ("d", Value::String("kept".into())),
                ])]),
            ),
        ]);

        assert_eq!(
            normalise(value),
            record(&[(
                "b",
                Value::Array(vec![record(&[("d", Value::String("kept".into()))])])
            )])
        );
    }
}
