//! Static network registry: chain identifiers and stable-asset contracts.
//!
//! Lookups are case-insensitive and never fail. Unknown networks resolve to
//! the fallback chain ([`FALLBACK_NETWORK`]); asset strings other than the
//! canonical stable-asset symbol pass through untouched, since they are
//! assumed to already be contract addresses.

use crate::constants::STABLE_ASSET_SYMBOL;

/// Network whose entries are used when a lookup misses.
pub const FALLBACK_NETWORK: &str = "polygon";

/// Chain ID returned for unrecognized networks.
pub const FALLBACK_CHAIN_ID: u64 = 137;

struct NetworkEntry {
    name: &'static str,
    chain_id: u64,
    usdc: Option<&'static str>,
}

const NETWORKS: &[NetworkEntry] = &[
    NetworkEntry {
        name: "polygon",
        chain_id: 137,
        usdc: Some("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
    },
    NetworkEntry {
        name: "base",
        chain_id: 8453,
        usdc: Some("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
    },
    NetworkEntry {
        name: "ethereum",
        chain_id: 1,
        usdc: Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
    },
    NetworkEntry {
        name: "arbitrum",
        chain_id: 42161,
        usdc: Some("0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
    },
    NetworkEntry {
        name: "abstract",
        chain_id: 2741,
        usdc: Some("0x84A71ccD554Cc1b02749b35d22F684CC8ec987e1"),
    },
    NetworkEntry {
        name: "abstract-testnet",
        chain_id: 11124,
        usdc: None,
    },
];

fn lookup(network: &str) -> Option<&'static NetworkEntry> {
    NETWORKS
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(network))
}

/// Chain ID for a named network, or [`FALLBACK_CHAIN_ID`] if unrecognized.
pub fn chain_id(network: &str) -> u64 {
    lookup(network)
        .map(|entry| entry.chain_id)
        .unwrap_or(FALLBACK_CHAIN_ID)
}

/// Resolve an asset to a contract address string.
///
/// `USDC` (any case) maps to the network's USDC contract, or the fallback
/// network's contract when the network has none. Anything else is returned
/// unchanged.
pub fn asset_address(asset: &str, network: &str) -> String {
    if !asset.eq_ignore_ascii_case(STABLE_ASSET_SYMBOL) {
        return asset.to_string();
    }

    lookup(network)
        .and_then(|entry| entry.usdc)
        .or_else(|| lookup(FALLBACK_NETWORK).and_then(|entry| entry.usdc))
        .map(str::to_string)
        .unwrap_or_else(|| asset.to_string())
}

/// Whether the registry has an entry for `network`.
pub fn is_known(network: &str) -> bool {
    lookup(network).is_some()
}

/// Names of all registered networks.
pub fn known_networks() -> Vec<&'static str> {
    NETWORKS.iter().map(|entry| entry.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_known_networks() {
        assert_eq!(chain_id("polygon"), 137);
        assert_eq!(chain_id("base"), 8453);
        assert_eq!(chain_id("ethereum"), 1);
        assert_eq!(chain_id("arbitrum"), 42161);
        assert_eq!(chain_id("abstract"), 2741);
        assert_eq!(chain_id("abstract-testnet"), 11124);
    }

    #[test]
    fn test_chain_id_is_case_insensitive() {
        assert_eq!(chain_id("BASE"), 8453);
        assert_eq!(chain_id("Arbitrum"), 42161);
    }

    #[test]
    fn test_chain_id_unknown_falls_back() {
        assert_eq!(chain_id("solana"), FALLBACK_CHAIN_ID);
        assert_eq!(chain_id(""), FALLBACK_CHAIN_ID);
    }

    #[test]
    fn test_usdc_resolves_per_network() {
        assert_eq!(
            asset_address("USDC", "base"),
            "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
        );
        assert_eq!(
            asset_address("usdc", "ETHEREUM"),
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
        );
    }

    #[test]
    fn test_usdc_missing_pair_uses_fallback_network() {
        let polygon = asset_address("USDC", "polygon");
        assert_eq!(asset_address("USDC", "abstract-testnet"), polygon);
        assert_eq!(asset_address("USDC", "unknown-chain"), polygon);
    }

    #[test]
    fn test_other_assets_pass_through() {
        let addr = "0x0000000000000000000000000000000000000abc";
        assert_eq!(asset_address(addr, "base"), addr);
        assert_eq!(asset_address("DAI", "base"), "DAI");
    }

    #[test]
    fn test_known_networks() {
        assert!(is_known("Polygon"));
        assert!(!is_known("solana"));
        assert_eq!(known_networks().len(), 6);
    }
}
