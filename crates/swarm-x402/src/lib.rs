//! x402 pay-per-request client and batch provenance trees.
//!
//! Implements the HTTP 402 handshake from the paying side: fetch a resource,
//! parse the payment demand, sign an EIP-712 authorization with the agent's
//! key, and retry with an `X-PAYMENT` header, up to a fixed attempt budget.
//! Separately, [`merkle`] builds SHA-256 hash trees over fetched content so
//! derived artifacts can prove which inputs they were built from.
//!
//! # Quick example
//!
//! ```no_run
//! use alloy::signers::local::PrivateKeySigner;
//! use x402::{TypedDataSigner, X402Client};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), x402::X402Error> {
//! let key: PrivateKeySigner = "0xYOUR_KEY".parse().unwrap();
//! let client = X402Client::new(TypedDataSigner::new(key))?;
//!
//! let outcome = client
//!     .fetch("https://api.example.com/data", reqwest::Method::GET)
//!     .await?;
//! println!("{} after {} attempts", outcome.response.status, outcome.attempts);
//! # Ok(())
//! # }
//! ```

// Core types and traits
pub mod constants;
pub mod error;
pub mod network;
pub mod payment;
pub mod scheme;

// Demand parsing and signing
pub mod demand;
pub mod eip712;
pub mod signer;

// Handshake
pub mod config;
pub mod http_client;

// Provenance
pub mod merkle;

use alloy::sol;

// EIP-712 struct for payment authorizations.
// The sol! macro derives SolStruct which provides eip712_signing_hash().
sol! {
    #[derive(Debug)]
    struct Payment {
        address payTo;
        uint256 amount;
        address asset;
        uint256 nonce;
        uint256 expiry;
        string resourceUrl;
    }
}

// Re-exports
pub use config::ClientConfig;
pub use constants::*;
pub use demand::DemandParser;
pub use eip712::VerifyingContract;
pub use error::X402Error;
pub use http_client::{FetchOutcome, HandshakeState, ReqwestTransport, X402Client};
pub use merkle::{MerkleTree, Proof, ProofStep, Side};
pub use payment::*;
pub use scheme::*;
pub use signer::TypedDataSigner;
