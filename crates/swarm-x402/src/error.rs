use thiserror::Error;

/// Errors returned by x402 operations.
///
/// A terminal non-2xx, non-402 status is not an error: it comes back as a
/// [`HandshakeState::Rejected`](crate::HandshakeState::Rejected) outcome.
#[derive(Debug, Error)]
pub enum X402Error {
    #[error("malformed payment demand: {0}")]
    MalformedDemand(String),

    #[error("invalid demand field '{field}': {value}")]
    InvalidDemandField { field: &'static str, value: String },

    #[error("payment retries exceeded for {url} after {attempts} attempts")]
    RetriesExceeded { url: String, attempts: u32 },

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("leaf index {index} out of range for tree with {leaves} leaves")]
    LeafOutOfRange { index: usize, leaves: usize },

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl X402Error {
    pub(crate) fn invalid_field(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidDemandField {
            field,
            value: value.into(),
        }
    }
}
