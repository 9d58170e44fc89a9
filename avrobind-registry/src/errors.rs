use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("get schema: transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("get schema: invalid response from schema registry ({url}, status {status}): {reason}")]
    InvalidResponse {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("get schema: unable to decode schema registry response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid schema fetcher configuration: {0}")]
    Config(String),
}
