//! EIP-712 typed-data construction, signing hashes, and signature recovery.
//!
//! Provides functions for:
//! - Choosing the domain's verifying contract ([`VerifyingContract`])
//! - Building EIP-712 domains ([`payment_domain`])
//! - Computing signing hashes ([`signing_hash`])
//! - Recovering signers with EIP-2 malleability protection ([`recover_signer`])
//! - Encoding signatures to hex ([`encode_signature_hex`])

use std::borrow::Cow;

use alloy::primitives::{Address, Signature, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};

use crate::constants::{EIP712_DOMAIN_NAME, EIP712_DOMAIN_VERSION, NULL_ADDRESS};
use crate::{network, Payment, X402Error};

/// How the domain's `verifyingContract` is chosen for a demand.
///
/// `FacilitatorSuffix` reproduces the established heuristic: when the
/// facilitator identifier contains `0x`, its last `/`-separated segment is
/// taken as the address. Deployments that know their contract should pin it
/// with `Fixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyingContract {
    #[default]
    FacilitatorSuffix,
    Fixed(Address),
    Zero,
}

impl VerifyingContract {
    /// Resolve the verifying contract for a facilitator identifier.
    pub fn resolve(&self, facilitator: &str) -> Address {
        match self {
            Self::Fixed(address) => *address,
            Self::Zero => NULL_ADDRESS,
            Self::FacilitatorSuffix => facilitator_suffix(facilitator),
        }
    }
}

fn facilitator_suffix(facilitator: &str) -> Address {
    if !facilitator.contains("0x") {
        return NULL_ADDRESS;
    }
    let segment = facilitator.rsplit('/').next().unwrap_or_default();
    segment.parse().unwrap_or_else(|_| {
        tracing::warn!(
            facilitator = %facilitator,
            "facilitator suffix is not an address, using null verifying contract"
        );
        NULL_ADDRESS
    })
}

/// Build the EIP-712 domain for a network and verifying contract.
pub fn payment_domain(network_name: &str, verifying_contract: Address) -> Eip712Domain {
    Eip712Domain {
        name: Some(Cow::Borrowed(EIP712_DOMAIN_NAME)),
        version: Some(Cow::Borrowed(EIP712_DOMAIN_VERSION)),
        chain_id: Some(U256::from(network::chain_id(network_name))),
        verifying_contract: Some(verifying_contract),
        salt: None,
    }
}

/// Compute the EIP-712 signing hash (`keccak256(0x1901 || domainSeparator || structHash)`).
pub fn signing_hash(payment: &Payment, domain: &Eip712Domain) -> B256 {
    payment.eip712_signing_hash(domain)
}

/// secp256k1 curve order N / 2. Signatures with s > this are malleable (EIP-2).
const SECP256K1_N_DIV_2: U256 = U256::from_limbs([
    0xBFD25E8CD0364140,
    0xBAAEDCE6AF48A03B,
    0xFFFFFFFFFFFFFFFE,
    0x7FFFFFFFFFFFFFFF,
]);

/// Recover the address that signed `payment` under `domain`.
/// Rejects high-s signatures to prevent malleability (EIP-2).
pub fn recover_signer(
    payment: &Payment,
    domain: &Eip712Domain,
    signature_bytes: &[u8],
) -> Result<Address, X402Error> {
    if signature_bytes.len() != 65 {
        return Err(X402Error::SignatureError(format!(
            "signature must be 65 bytes, got {}",
            signature_bytes.len()
        )));
    }

    let sig = Signature::from_raw(signature_bytes)
        .map_err(|e| X402Error::SignatureError(format!("invalid signature: {e}")))?;

    if sig.s() > SECP256K1_N_DIV_2 {
        return Err(X402Error::SignatureError(
            "high-s signature rejected (EIP-2 malleability)".to_string(),
        ));
    }

    let hash = signing_hash(payment, domain);
    sig.recover_address_from_prehash(&hash)
        .map_err(|e| X402Error::SignatureError(format!("recovery failed: {e}")))
}

/// Encode a Signature to a hex string with 0x prefix (65 bytes -> 0x + 130 hex).
/// Uses Electrum notation: v = 27 or 28 in the last byte.
pub fn encode_signature_hex(sig: &Signature) -> String {
    format!("0x{}", alloy::hex::encode(sig.as_bytes()))
}

/// Decode a 0x-prefixed (or bare) hex signature.
pub fn decode_signature_hex(sig: &str) -> Result<Vec<u8>, X402Error> {
    alloy::hex::decode(sig.strip_prefix("0x").unwrap_or(sig))
        .map_err(|e| X402Error::SignatureError(format!("invalid signature hex: {e}")))
}
