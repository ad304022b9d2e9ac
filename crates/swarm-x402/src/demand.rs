//! Normalizes 402 payment terms into a canonical [`PaymentDemand`].
//!
//! Terms are looked for in two places, in order:
//! 1. the `X-Payment-Requirements` header, a JSON document (plain or base64);
//! 2. the response body, under `paymentRequirements` or as the whole body.
//!
//! Either document may instead be a standard x402 body whose `accepts` array
//! holds the terms; the first entry is used. Vendors disagree on key names,
//! so each canonical field is resolved through an ordered alias list.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use crate::constants::{
    DEFAULT_EXPIRY_SECS, DEFAULT_NETWORK, REQUIREMENTS_BODY_FIELD, REQUIREMENTS_HEADER,
    STABLE_ASSET_SYMBOL,
};
use crate::{PaymentDemand, X402Error};

/// Accepted keys per canonical field, most preferred first.
pub mod aliases {
    pub const PAY_TO: &[&str] = &["payTo", "recipient"];
    pub const AMOUNT: &[&str] = &["amount", "maxAmountRequired"];
    pub const ASSET: &[&str] = &["asset"];
    pub const NETWORK: &[&str] = &["network"];
    pub const FACILITATOR: &[&str] = &["facilitatorUrl", "facilitator"];
    pub const NONCE: &[&str] = &["nonce"];
    pub const EXPIRY: &[&str] = &["expiry"];
    pub const RESOURCE_URL: &[&str] = &["resourceUrl"];
    pub const METHOD: &[&str] = &["method"];
}

/// Parses payment-required responses into [`PaymentDemand`]s.
#[derive(Debug, Clone)]
pub struct DemandParser {
    default_network: String,
    default_facilitator: String,
}

impl DemandParser {
    pub fn new(default_network: impl Into<String>) -> Self {
        Self {
            default_network: default_network.into(),
            default_facilitator: String::new(),
        }
    }

    /// Facilitator assumed for demands that name none.
    pub fn with_default_facilitator(mut self, facilitator: impl Into<String>) -> Self {
        self.default_facilitator = facilitator.into();
        self
    }

    /// Parse a demand, synthesizing a missing nonce/expiry from the current time.
    pub fn parse(&self, headers: &HeaderMap, body: &Value) -> Result<PaymentDemand, X402Error> {
        let now_ms = u64::try_from(unix_now().as_millis()).unwrap_or(u64::MAX);
        self.parse_at(headers, body, now_ms)
    }

    /// Parse a demand with an explicit clock reading (Unix milliseconds).
    pub fn parse_at(
        &self,
        headers: &HeaderMap,
        body: &Value,
        now_ms: u64,
    ) -> Result<PaymentDemand, X402Error> {
        if let Some(doc) = header_document(headers) {
            if let Some(demand) = terms_object(&doc).and_then(|t| self.build(t, now_ms)) {
                tracing::debug!(source = "header", pay_to = %demand.pay_to, amount = %demand.amount, "parsed payment demand");
                return Ok(demand);
            }
            tracing::warn!("{REQUIREMENTS_HEADER} lacks a usable payTo/amount, trying body");
        }

        if let Some(demand) = body_document(body)
            .and_then(terms_object)
            .and_then(|t| self.build(t, now_ms))
        {
            tracing::debug!(source = "body", pay_to = %demand.pay_to, amount = %demand.amount, "parsed payment demand");
            return Ok(demand);
        }

        Err(X402Error::MalformedDemand(format!(
            "no usable payTo/amount in {REQUIREMENTS_HEADER} header or response body"
        )))
    }

    fn build(&self, terms: &Map<String, Value>, now_ms: u64) -> Option<PaymentDemand> {
        let pay_to = resolve_text(terms, aliases::PAY_TO)?;
        let amount = resolve_text(terms, aliases::AMOUNT)?;

        let expiry = match resolve(terms, aliases::EXPIRY) {
            None => now_ms / 1000 + DEFAULT_EXPIRY_SECS,
            Some(value) => as_u64(value).unwrap_or_else(|| {
                tracing::warn!(expiry = %value, "unreadable expiry, using default window");
                now_ms / 1000 + DEFAULT_EXPIRY_SECS
            }),
        };

        Some(PaymentDemand {
            pay_to,
            amount,
            asset: resolve_text(terms, aliases::ASSET)
                .unwrap_or_else(|| STABLE_ASSET_SYMBOL.to_string()),
            network: resolve_text(terms, aliases::NETWORK)
                .unwrap_or_else(|| self.default_network.clone()),
            facilitator: resolve_text(terms, aliases::FACILITATOR)
                .unwrap_or_else(|| self.default_facilitator.clone()),
            nonce: resolve_text(terms, aliases::NONCE).unwrap_or_else(|| now_ms.to_string()),
            expiry,
            resource_url: resolve_text(terms, aliases::RESOURCE_URL).unwrap_or_default(),
            method: resolve_text(terms, aliases::METHOD).unwrap_or_else(|| "GET".to_string()),
        })
    }
}

impl Default for DemandParser {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK)
    }
}

/// Best-effort body decoding: JSON if it parses, otherwise `Null`.
pub fn decode_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

pub(crate) fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| {
            tracing::error!("system clock before UNIX epoch");
            Duration::ZERO
        })
}

fn header_document(headers: &HeaderMap) -> Option<Value> {
    let raw = headers.get(REQUIREMENTS_HEADER)?;
    let Ok(text) = std::str::from_utf8(raw.as_bytes()) else {
        tracing::warn!("{REQUIREMENTS_HEADER} is not valid UTF-8, ignoring");
        return None;
    };

    serde_json::from_str::<Value>(text)
        .ok()
        .or_else(|| {
            base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .ok()
                .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        })
        .or_else(|| {
            tracing::warn!("{REQUIREMENTS_HEADER} is neither JSON nor base64 JSON");
            None
        })
}

fn body_document(body: &Value) -> Option<&Value> {
    match body.get(REQUIREMENTS_BODY_FIELD) {
        Some(nested) if nested.is_object() => Some(nested),
        _ if body.is_object() => Some(body),
        _ => None,
    }
}

fn terms_object(doc: &Value) -> Option<&Map<String, Value>> {
    let obj = doc.as_object()?;
    if resolve(obj, aliases::PAY_TO).is_some() {
        return Some(obj);
    }
    obj.get("accepts")
        .and_then(Value::as_array)
        .and_then(|accepts| accepts.first())
        .and_then(Value::as_object)
        .or(Some(obj))
}

fn resolve<'a>(terms: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| terms.get(*key))
        .find(|value| !value.is_null())
}

fn resolve_text(terms: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match resolve(terms, keys)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};
    use serde_json::json;

    const NOW_MS: u64 = 1_700_000_000_123;

    fn terms() -> Value {
        json!({
            "payTo": "0x1111111111111111111111111111111111111111",
            "amount": "2500",
            "asset": "USDC",
            "network": "base",
            "facilitatorUrl": "https://facilitator.example/0x2222222222222222222222222222222222222222",
            "nonce": "77",
            "expiry": 1_700_003_600u64
        })
    }

    fn header_with(doc: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUIREMENTS_HEADER, HeaderValue::from_str(doc).unwrap());
        headers
    }

    #[test]
    fn test_header_and_body_forms_are_equivalent() {
        let parser = DemandParser::default();

        let from_header = parser
            .parse_at(&header_with(&terms().to_string()), &Value::Null, NOW_MS)
            .unwrap();
        let from_nested_body = parser
            .parse_at(
                &HeaderMap::new(),
                &json!({ "paymentRequirements": terms() }),
                NOW_MS,
            )
            .unwrap();
        let from_whole_body = parser
            .parse_at(&HeaderMap::new(), &terms(), NOW_MS)
            .unwrap();

        assert_eq!(from_header, from_nested_body);
        assert_eq!(from_header, from_whole_body);
        assert_eq!(from_header.amount, "2500");
        assert_eq!(from_header.nonce, "77");
        assert_eq!(from_header.expiry, 1_700_003_600);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"X-Payment-Requirements").unwrap(),
            HeaderValue::from_str(&terms().to_string()).unwrap(),
        );
        let demand = DemandParser::default()
            .parse_at(&headers, &Value::Null, NOW_MS)
            .unwrap();
        assert_eq!(demand.network, "base");
    }

    #[test]
    fn test_header_preferred_over_body() {
        let body = json!({ "payTo": "0xbody", "amount": "1" });
        let demand = DemandParser::default()
            .parse_at(&header_with(&terms().to_string()), &body, NOW_MS)
            .unwrap();
        assert_eq!(demand.amount, "2500");
    }

    #[test]
    fn test_base64_header_document() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(terms().to_string());
        let demand = DemandParser::default()
            .parse_at(&header_with(&encoded), &Value::Null, NOW_MS)
            .unwrap();
        assert_eq!(demand.pay_to, "0x1111111111111111111111111111111111111111");
    }

    #[test]
    fn test_vendor_aliases() {
        let body = json!({
            "paymentRequirements": {
                "recipient": "0xabc",
                "maxAmountRequired": 900,
                "facilitator": "corbits"
            }
        });
        let demand = DemandParser::default()
            .parse_at(&HeaderMap::new(), &body, NOW_MS)
            .unwrap();
        assert_eq!(demand.pay_to, "0xabc");
        assert_eq!(demand.amount, "900");
        assert_eq!(demand.facilitator, "corbits");
    }

    #[test]
    fn test_primary_alias_wins_over_secondary() {
        let body = json!({ "payTo": "0xprimary", "recipient": "0xsecondary", "amount": "1" });
        let demand = DemandParser::default()
            .parse_at(&HeaderMap::new(), &body, NOW_MS)
            .unwrap();
        assert_eq!(demand.pay_to, "0xprimary");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let body = json!({ "payTo": "0xabc", "amount": "10" });
        let demand = DemandParser::new("arbitrum")
            .parse_at(&HeaderMap::new(), &body, NOW_MS)
            .unwrap();
        assert_eq!(demand.asset, "USDC");
        assert_eq!(demand.network, "arbitrum");
        assert_eq!(demand.facilitator, "");
        assert_eq!(demand.nonce, NOW_MS.to_string());
        assert_eq!(demand.expiry, NOW_MS / 1000 + 3600);
        assert_eq!(demand.method, "GET");
    }

    #[test]
    fn test_default_facilitator_only_fills_gaps() {
        let parser = DemandParser::default().with_default_facilitator("https://f.example");

        let bare = json!({ "payTo": "0xabc", "amount": "10" });
        let demand = parser.parse_at(&HeaderMap::new(), &bare, NOW_MS).unwrap();
        assert_eq!(demand.facilitator, "https://f.example");

        let demand = parser.parse_at(&HeaderMap::new(), &terms(), NOW_MS).unwrap();
        assert!(demand.facilitator.starts_with("https://facilitator.example/"));
    }

    #[test]
    fn test_accepts_array_first_entry() {
        let body = json!({
            "x402Version": 1,
            "accepts": [
                { "payTo": "0xfirst", "maxAmountRequired": "5", "network": "base" },
                { "payTo": "0xsecond", "maxAmountRequired": "6" }
            ]
        });
        let demand = DemandParser::default()
            .parse_at(&HeaderMap::new(), &body, NOW_MS)
            .unwrap();
        assert_eq!(demand.pay_to, "0xfirst");
        assert_eq!(demand.amount, "5");
    }

    #[test]
    fn test_unusable_header_falls_back_to_body() {
        let body = json!({ "payTo": "0xbody", "amount": "3" });
        let demand = DemandParser::default()
            .parse_at(&header_with("{not json"), &body, NOW_MS)
            .unwrap();
        assert_eq!(demand.pay_to, "0xbody");
    }

    #[test]
    fn test_missing_pay_to_is_malformed() {
        let result = DemandParser::default().parse_at(
            &HeaderMap::new(),
            &json!({ "amount": "3" }),
            NOW_MS,
        );
        assert!(matches!(result, Err(X402Error::MalformedDemand(_))));
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        let result = DemandParser::default().parse_at(&HeaderMap::new(), &Value::Null, NOW_MS);
        assert!(matches!(result, Err(X402Error::MalformedDemand(_))));

        let result =
            DemandParser::default().parse_at(&HeaderMap::new(), &json!(["payTo"]), NOW_MS);
        assert!(matches!(result, Err(X402Error::MalformedDemand(_))));
    }

    #[test]
    fn test_unreadable_expiry_uses_default() {
        let body = json!({ "payTo": "0xabc", "amount": "1", "expiry": "soon" });
        let demand = DemandParser::default()
            .parse_at(&HeaderMap::new(), &body, NOW_MS)
            .unwrap();
        assert_eq!(demand.expiry, NOW_MS / 1000 + 3600);
    }

    #[test]
    fn test_utf8_header_document() {
        let doc = json!({
            "payTo": "0x1111111111111111111111111111111111111111",
            "amount": "5",
            "resourceUrl": "https://api.example.com/café"
        })
        .to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            REQUIREMENTS_HEADER,
            HeaderValue::from_bytes(doc.as_bytes()).unwrap(),
        );
        let demand = DemandParser::default()
            .parse_at(&headers, &Value::Null, NOW_MS)
            .unwrap();
        assert_eq!(demand.resource_url, "https://api.example.com/café");
    }

    #[test]
    fn test_non_object_requirements_field_falls_back_to_body() {
        let body = json!({
            "paymentRequirements": "see documentation",
            "payTo": "0xbody",
            "amount": "4"
        });
        let demand = DemandParser::default()
            .parse_at(&HeaderMap::new(), &body, NOW_MS)
            .unwrap();
        assert_eq!(demand.pay_to, "0xbody");
        assert_eq!(demand.amount, "4");
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(br#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(decode_body(b"<html>"), Value::Null);
        assert_eq!(decode_body(b""), Value::Null);
    }
}
