use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::X402Error;

/// Canonical payment terms parsed from a 402 response.
///
/// `amount` and `nonce` keep the server's decimal text; they are interpreted
/// as unsigned integers only at signing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDemand {
    pub pay_to: String,
    pub amount: String,
    pub asset: String,
    pub network: String,
    pub facilitator: String,
    pub nonce: String,
    /// Unix seconds, exclusive upper bound on validity.
    pub expiry: u64,
    pub resource_url: String,
    pub method: String,
}

impl PaymentDemand {
    /// Bind the demand to the request that triggered it.
    pub fn with_request_context(mut self, resource_url: &str, method: &str) -> Self {
        self.resource_url = resource_url.to_string();
        self.method = method.to_string();
        self
    }
}

/// Signed payment authorization, sent as the `X-PAYMENT` header value.
///
/// Flat JSON: exactly these eight fields, no envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationToken {
    /// 0x-prefixed 65-byte recoverable signature.
    pub signature: String,
    pub payer: Address,
    pub pay_to: String,
    pub amount: String,
    pub asset: String,
    pub network: String,
    pub nonce: String,
    pub expiry: u64,
}

impl AuthorizationToken {
    /// Whether this token was issued for `demand` (same nonce and terms).
    pub fn matches(&self, demand: &PaymentDemand) -> bool {
        self.nonce == demand.nonce
            && self.expiry == demand.expiry
            && self.amount == demand.amount
            && self.pay_to == demand.pay_to
            && self.network == demand.network
    }
}

/// Serialize a token for the `X-PAYMENT` header.
pub fn encode_token(token: &AuthorizationToken) -> Result<String, X402Error> {
    Ok(serde_json::to_string(token)?)
}

/// Parse an `X-PAYMENT` header value.
pub fn decode_token(header: &str) -> Result<AuthorizationToken, X402Error> {
    Ok(serde_json::from_str(header)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> AuthorizationToken {
        AuthorizationToken {
            signature: "0xdead".to_string(),
            payer: Address::ZERO,
            pay_to: "0x0000000000000000000000000000000000000001".to_string(),
            amount: "1000".to_string(),
            asset: "USDC".to_string(),
            network: "base".to_string(),
            nonce: "42".to_string(),
            expiry: 1_700_000_000,
        }
    }

    #[test]
    fn test_token_wire_form_is_flat() {
        let encoded = encode_token(&sample_token()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        let obj = json.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["amount", "asset", "expiry", "network", "nonce", "payTo", "payer", "signature"]
        );
        assert_eq!(json["expiry"], 1_700_000_000u64);
        assert_eq!(json["payTo"], "0x0000000000000000000000000000000000000001");
    }

    #[test]
    fn test_decode_token() {
        let token = sample_token();
        let decoded = decode_token(&encode_token(&token).unwrap()).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_token("not json"),
            Err(X402Error::SerdeError(_))
        ));
    }

    #[test]
    fn test_request_context_is_filled() {
        let demand = PaymentDemand {
            pay_to: "0x01".to_string(),
            amount: "1".to_string(),
            asset: "USDC".to_string(),
            network: "base".to_string(),
            facilitator: String::new(),
            nonce: "1".to_string(),
            expiry: 10,
            resource_url: String::new(),
            method: "GET".to_string(),
        }
        .with_request_context("https://api.example.com/data", "POST");

        assert_eq!(demand.resource_url, "https://api.example.com/data");
        assert_eq!(demand.method, "POST");
    }
}
