use std::env;

use url::Url;
use x402::{ClientConfig, X402Error};

use crate::messages::Role;

const DEFAULT_COORDINATOR_WS_URL: &str = "ws://localhost:8080";

#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Identifier reported to the coordinator (default `<role>-001`)
    pub agent_id: String,
    pub role: Role,
    /// WebSocket endpoint of the coordinator (`ws://` or `wss://`)
    pub coordinator_url: Url,
    /// Signing and handshake settings
    pub client: ClientConfig,
}

impl AgentConfig {
    /// Load from the process environment (after `.env`, if present).
    ///
    /// Reads `AGENT_ROLE` (`scout` | `verifier` | `synthesizer`, default
    /// `scout`), `AGENT_ID` and `COORDINATOR_WS_URL`, plus everything
    /// [`ClientConfig::from_lookup`] reads.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let role = match get("AGENT_ROLE") {
            Some(raw) => raw.parse::<Role>().map_err(ConfigError::InvalidRole)?,
            None => Role::Scout,
        };

        let agent_id = get("AGENT_ID")
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|| format!("{role}-001"));

        let raw_url = get("COORDINATOR_WS_URL")
            .map(|u| u.trim().to_string())
            .unwrap_or_else(|| DEFAULT_COORDINATOR_WS_URL.to_string());
        let coordinator_url = Url::parse(&raw_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "ws" | "wss") && u.host_str().is_some())
            .ok_or(ConfigError::InvalidUrl(raw_url))?;

        let client = ClientConfig::from_lookup(&lookup)?;

        tracing::debug!(
            agent_id = %agent_id,
            role = %role,
            coordinator = %coordinator_url,
            address = %client.address(),
            "agent configuration loaded"
        );

        Ok(Self {
            agent_id,
            role,
            coordinator_url,
            client,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid AGENT_ROLE: {0} (expected scout, verifier or synthesizer)")]
    InvalidRole(String),

    #[error("invalid COORDINATOR_WS_URL: {0} (expected ws:// or wss://)")]
    InvalidUrl(String),

    #[error(transparent)]
    Client(#[from] X402Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn load(vars: &[(&str, &str)]) -> Result<AgentConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("AGENT_PRIVATE_KEY", TEST_KEY)]).unwrap();
        assert_eq!(config.role, Role::Scout);
        assert_eq!(config.agent_id, "scout-001");
        assert_eq!(config.coordinator_url.as_str(), "ws://localhost:8080/");
        assert_eq!(config.client.max_attempts, 3);
    }

    #[test]
    fn test_role_and_url_overrides() {
        let config = load(&[
            ("AGENT_PRIVATE_KEY", TEST_KEY),
            ("AGENT_ROLE", "Verifier"),
            ("COORDINATOR_WS_URL", "wss://coordinator.example/agents"),
        ])
        .unwrap();
        assert_eq!(config.role, Role::Verifier);
        assert_eq!(config.agent_id, "verifier-001");
        assert_eq!(config.coordinator_url.scheme(), "wss");
        assert_eq!(config.coordinator_url.path(), "/agents");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("AGENT_PRIVATE_KEY", TEST_KEY), ("AGENT_ROLE", "oracle")]),
            Err(ConfigError::InvalidRole(_))
        ));
        for url in ["localhost:8080", "http://localhost:8080", "not a url"] {
            assert!(
                matches!(
                    load(&[("AGENT_PRIVATE_KEY", TEST_KEY), ("COORDINATOR_WS_URL", url)]),
                    Err(ConfigError::InvalidUrl(_))
                ),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_client_errors_propagate() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Client(X402Error::ConfigError(_)))
        ));
    }
}
