//! Up-front check that an unmarshal target can hold the decoded datum at all.
//!
//! The probe deserializer records which `deserialize_*` hint the target type
//! asks for first and bails out immediately, so the check never touches the
//! datum itself.

use apache_avro::types::Value;
use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use std::fmt;

use crate::binding::value_kind;
use crate::errors::{MarshalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetShape {
    /// struct or map
    Container,
    Sequence,
    Scalar,
    /// anything that decides on the datum (`Option`, enums, self-describing values)
    Flexible,
}

#[derive(Debug)]
struct Probed(TargetShape);

impl fmt::Display for Probed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target shape probed: {:?}", self.0)
    }
}

impl std::error::Error for Probed {}

impl de::Error for Probed {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Probed(TargetShape::Flexible)
    }
}

struct ShapeProbe;

macro_rules! probe {
    ($($method:ident => $shape:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> std::result::Result<V::Value, Probed> {
                Err(Probed(TargetShape::$shape))
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ShapeProbe {
    type Error = Probed;

    probe! {
        deserialize_any => Flexible,
        deserialize_bool => Scalar,
        deserialize_i8 => Scalar,
        deserialize_i16 => Scalar,
        deserialize_i32 => Scalar,
        deserialize_i64 => Scalar,
        deserialize_u8 => Scalar,
        deserialize_u16 => Scalar,
        deserialize_u32 => Scalar,
        deserialize_u64 => Scalar,
        deserialize_f32 => Scalar,
        deserialize_f64 => Scalar,
        deserialize_char => Scalar,
        deserialize_str => Scalar,
        deserialize_string => Scalar,
        deserialize_bytes => Scalar,
        deserialize_byte_buf => Scalar,
        deserialize_option => Flexible,
        deserialize_unit => Scalar,
        deserialize_seq => Sequence,
        deserialize_map => Container,
        deserialize_identifier => Scalar,
        deserialize_ignored_any => Flexible,
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> std::result::Result<V::Value, Probed> {
        Err(Probed(TargetShape::Scalar))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, Probed> {
        // a newtype has the shape of what it wraps
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> std::result::Result<V::Value, Probed> {
        Err(Probed(TargetShape::Sequence))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> std::result::Result<V::Value, Probed> {
        Err(Probed(TargetShape::Sequence))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> std::result::Result<V::Value, Probed> {
        Err(Probed(TargetShape::Container))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> std::result::Result<V::Value, Probed> {
        Err(Probed(TargetShape::Flexible))
    }
}

pub(crate) fn target_shape<T: DeserializeOwned>() -> TargetShape {
    match T::deserialize(ShapeProbe) {
        Err(Probed(shape)) => shape,
        Ok(_) => TargetShape::Flexible,
    }
}

/// Fails with `UnsupportedTarget` when `T` cannot possibly hold `datum`.
pub(crate) fn check_target<T: DeserializeOwned>(datum: &Value) -> Result<()> {
    let datum = match datum {
        Value::Union(_, inner) => inner.as_ref(),
        other => other,
    };
    let shape = target_shape::<T>();

    let supported = match (shape, datum) {
        (TargetShape::Flexible, _) => true,
        (TargetShape::Container, Value::Record(_) | Value::Map(_)) => true,
        (TargetShape::Sequence, Value::Array(_) | Value::Bytes(_) | Value::Fixed(..)) => true,
        (TargetShape::Scalar, Value::Record(_) | Value::Map(_) | Value::Array(_)) => false,
        (TargetShape::Scalar, _) => true,
        _ => false,
    };

    if supported {
        Ok(())
    } else {
        Err(MarshalError::UnsupportedTarget(format!(
            "cannot unmarshal a {} datum into `{}`",
            value_kind(datum),
            std::any::type_name::<T>()
        )))
    }
}
