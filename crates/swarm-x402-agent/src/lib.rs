//! Dispatcher-facing task boundary for x402 swarm agents.
//!
//! A scout fetches paywalled sources through the x402 handshake and reports
//! content hashes and payment proofs. A verifier re-hashes those chunks
//! against their declared hashes. A synthesizer turns verified data into a
//! Merkle provenance artifact. All three speak JSON frames over a WebSocket
//! to the coordinator.

pub mod config;
pub mod error;
pub mod messages;
pub mod provenance;
pub mod router;
pub mod scout;
pub mod verifier;

pub use config::{AgentConfig, ConfigError};
pub use error::AgentError;
pub use messages::{Inbound, Outbound, Role};
pub use router::TaskRouter;
