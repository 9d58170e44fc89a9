use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarshalError>;

/// The marshaller call that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Marshal,
    Unmarshal,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Marshal => "marshal",
            Operation::Unmarshal => "unmarshal",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("{operation}: error parsing avro schema: {source}")]
    SchemaParse {
        operation: Operation,
        #[source]
        source: apache_avro::Error,
    },

    #[error("marshal: error encoding avro datum: {0}")]
    Encoding(String),

    #[error("unmarshal: error decoding avro datum: {0}")]
    Decoding(String),

    #[error("unmarshal: unsupported target: {0}")]
    UnsupportedTarget(String),
}

impl MarshalError {
    /// Returns the operation that failed.
    pub fn operation(&self) -> Operation {
        match self {
            MarshalError::SchemaParse { operation, .. } => *operation,
            MarshalError::Encoding(_) => Operation::Marshal,
            MarshalError::Decoding(_) | MarshalError::UnsupportedTarget(_) => Operation::Unmarshal,
        }
    }
}
