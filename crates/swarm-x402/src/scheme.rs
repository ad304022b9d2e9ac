//! Seams of the payment handshake.
//!
//! - [`PaymentSigner`]: turns a [`PaymentDemand`] into a signed [`AuthorizationToken`]
//! - [`Transport`]: issues one HTTP request and buffers the response
//!
//! See [`crate::signer::TypedDataSigner`] and [`crate::http_client::ReqwestTransport`]
//! for the production implementations.

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

use crate::error::X402Error;
use crate::payment::{AuthorizationToken, PaymentDemand};

/// Signs payment demands. Signing is CPU-bound and never suspends.
pub trait PaymentSigner: Send + Sync {
    /// Sign an authorization for exactly this demand.
    fn authorize(&self, demand: &PaymentDemand) -> Result<AuthorizationToken, X402Error>;
}

/// A request as issued by the handshake client.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_payment_required(&self) -> bool {
        self.status == StatusCode::PAYMENT_REQUIRED
    }

    /// Body decoded as JSON, or `Null` when it is not JSON.
    pub fn json_body(&self) -> serde_json::Value {
        crate::demand::decode_body(&self.body)
    }

    /// Body as (lossy) UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues a single request. Implementations must be shareable across tasks.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &OutboundRequest,
    ) -> impl std::future::Future<Output = Result<TransportResponse, X402Error>> + Send;
}
