use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("x402 client error: {0}")]
    Client(#[from] x402::X402Error),

    #[error("dispatcher connection error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("frame encoding error: {0}")]
    Frame(#[from] serde_json::Error),
}
