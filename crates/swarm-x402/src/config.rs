use std::env;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use url::Url;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_NETWORK};
use crate::demand::DemandParser;
use crate::eip712::VerifyingContract;
use crate::http_client::ReqwestTransport;
use crate::{network, Transport, TypedDataSigner, X402Client, X402Error};

/// Everything the handshake needs: signing key, default network,
/// facilitator endpoint, attempt limit, and verifying-contract strategy.
#[derive(Clone)]
pub struct ClientConfig {
    /// Account key that signs every authorization.
    pub signing_key: PrivateKeySigner,
    /// Network assumed when a demand names none.
    pub default_network: String,
    /// Facilitator assumed when a demand names none.
    pub facilitator_url: Option<String>,
    /// Maximum requests per handshake (>= 1).
    pub max_attempts: u32,
    pub verifying_contract: VerifyingContract,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("signing_key", &"[REDACTED]")
            .field("address", &self.signing_key.address())
            .field("default_network", &self.default_network)
            .field("facilitator_url", &self.facilitator_url)
            .field("max_attempts", &self.max_attempts)
            .field("verifying_contract", &self.verifying_contract)
            .finish()
    }
}

impl ClientConfig {
    /// Config with defaults for everything but the key.
    pub fn new(signing_key: PrivateKeySigner) -> Self {
        Self {
            signing_key,
            default_network: DEFAULT_NETWORK.to_string(),
            facilitator_url: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            verifying_contract: VerifyingContract::default(),
        }
    }

    /// Load from the process environment (after `.env`, if present).
    ///
    /// | Variable | Required | Default |
    /// |---|---|---|
    /// | `AGENT_PRIVATE_KEY` | yes | |
    /// | `DEFAULT_NETWORK` | no | `polygon` |
    /// | `FACILITATOR_URL` | no | none |
    /// | `X402_MAX_ATTEMPTS` | no | `3` |
    /// | `VERIFYING_CONTRACT` | no | `facilitator` (or `zero`, or an address) |
    pub fn from_env() -> Result<Self, X402Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, X402Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let key = get("AGENT_PRIVATE_KEY").ok_or_else(|| {
            X402Error::ConfigError("missing required environment variable: AGENT_PRIVATE_KEY".into())
        })?;
        let signing_key: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|_| X402Error::ConfigError("invalid AGENT_PRIVATE_KEY".into()))?;

        let default_network = get("DEFAULT_NETWORK")
            .map(|n| n.trim().to_lowercase())
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        if !network::is_known(&default_network) {
            tracing::warn!(
                network = %default_network,
                known = ?network::known_networks(),
                "DEFAULT_NETWORK is not in the registry, chain lookups will use the fallback chain"
            );
        }

        let facilitator_url = match get("FACILITATOR_URL") {
            Some(raw) => {
                Url::parse(&raw)
                    .map_err(|_| X402Error::ConfigError(format!("invalid FACILITATOR_URL: {raw}")))?;
                Some(raw)
            }
            None => None,
        };

        let max_attempts = match get("X402_MAX_ATTEMPTS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(X402Error::ConfigError(format!(
                        "X402_MAX_ATTEMPTS must be a positive integer, got '{raw}'"
                    )))
                }
            },
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let verifying_contract = match get("VERIFYING_CONTRACT") {
            Some(raw) => parse_verifying_contract(raw.trim())?,
            None => VerifyingContract::default(),
        };
        if verifying_contract == VerifyingContract::FacilitatorSuffix {
            tracing::warn!(
                "verifying contract is inferred from the facilitator identifier; \
                 set VERIFYING_CONTRACT to pin it"
            );
        }

        Ok(Self {
            signing_key,
            default_network,
            facilitator_url,
            max_attempts,
            verifying_contract,
        })
    }

    pub fn address(&self) -> Address {
        self.signing_key.address()
    }

    pub fn signer(&self) -> TypedDataSigner {
        TypedDataSigner::with_verifying_contract(self.signing_key.clone(), self.verifying_contract)
    }

    pub fn demand_parser(&self) -> DemandParser {
        let parser = DemandParser::new(self.default_network.clone());
        match &self.facilitator_url {
            Some(url) => parser.with_default_facilitator(url.clone()),
            None => parser,
        }
    }

    /// Handshake client over the default reqwest transport.
    pub fn build_client(&self) -> Result<X402Client<ReqwestTransport, TypedDataSigner>, X402Error> {
        Ok(self.client_with_transport(ReqwestTransport::new()?))
    }

    /// Handshake client over a caller-supplied transport.
    pub fn client_with_transport<T: Transport>(&self, transport: T) -> X402Client<T, TypedDataSigner> {
        X402Client::with_transport(transport, self.signer())
            .with_demand_parser(self.demand_parser())
            .with_max_attempts(self.max_attempts)
    }
}

fn parse_verifying_contract(raw: &str) -> Result<VerifyingContract, X402Error> {
    match raw.to_ascii_lowercase().as_str() {
        "facilitator" => Ok(VerifyingContract::FacilitatorSuffix),
        "zero" => Ok(VerifyingContract::Zero),
        _ => raw
            .parse::<Address>()
            .map(VerifyingContract::Fixed)
            .map_err(|_| X402Error::ConfigError(format!("invalid VERIFYING_CONTRACT: {raw}"))),
    }
}
