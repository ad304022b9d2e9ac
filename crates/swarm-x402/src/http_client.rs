use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, PAYMENT_HEADER, RECEIPT_HEADER};
use crate::demand::DemandParser;
use crate::payment::encode_token;
use crate::{
    AuthorizationToken, OutboundRequest, PaymentSigner, Transport, TransportResponse, X402Error,
};

/// Progress of one bounded request/sign/retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Sent,
    AwaitingPayment,
    Signed,
    Retried,
    Success,
    Rejected,
    Exhausted,
}

impl HandshakeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Rejected | Self::Exhausted)
    }
}

/// Final response of a handshake that did not exhaust its attempts.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: TransportResponse,
    /// [`HandshakeState::Success`] for 2xx, [`HandshakeState::Rejected`] otherwise.
    pub state: HandshakeState,
    /// Requests issued, including the final one.
    pub attempts: u32,
    /// Authorization attached to the final request, if a payment was made.
    pub authorization: Option<AuthorizationToken>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.state == HandshakeState::Success
    }

    pub fn paid(&self) -> bool {
        self.authorization.is_some()
    }

    /// The server's payment receipt header, if any.
    pub fn receipt(&self) -> Option<&str> {
        self.response
            .headers
            .get(RECEIPT_HEADER)
            .and_then(|v| v.to_str().ok())
    }
}

/// HTTP client that automatically handles 402 payment responses.
///
/// On a 402 it parses the demand, signs a fresh authorization through the
/// provided [`PaymentSigner`], and re-issues the request with an `X-PAYMENT`
/// header. At most `max_attempts` requests are issued per call.
pub struct X402Client<T: Transport, S: PaymentSigner> {
    transport: T,
    signer: S,
    parser: DemandParser,
    max_attempts: u32,
}

impl<S: PaymentSigner> X402Client<ReqwestTransport, S> {
    /// Create a client over a default reqwest transport.
    pub fn new(signer: S) -> Result<Self, X402Error> {
        Ok(Self::with_transport(ReqwestTransport::new()?, signer))
    }
}

impl<T: Transport, S: PaymentSigner> X402Client<T, S> {
    /// Create a client over a custom transport.
    pub fn with_transport(transport: T, signer: S) -> Self {
        Self {
            transport,
            signer,
            parser: DemandParser::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Cap the number of requests per call. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Replace the demand parser (default network and facilitator).
    pub fn with_demand_parser(mut self, parser: DemandParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetch a URL with no extra headers or body.
    pub async fn fetch(&self, url: &str, method: Method) -> Result<FetchOutcome, X402Error> {
        self.execute(OutboundRequest::new(method, url)).await
    }

    /// Fetch with caller headers and an optional body.
    pub async fn fetch_with(
        &self,
        url: &str,
        method: Method,
        headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<FetchOutcome, X402Error> {
        let mut request = OutboundRequest::new(method, url).with_headers(headers);
        request.body = body;
        self.execute(request).await
    }

    /// Run the bounded handshake for `request`.
    ///
    /// Returns the first non-402 response. Fails with
    /// [`X402Error::RetriesExceeded`] if every attempt was answered with 402.
    pub async fn execute(&self, mut request: OutboundRequest) -> Result<FetchOutcome, X402Error> {
        let url = request.url.clone();
        let mut state = HandshakeState::Sent;
        let mut authorization = None;

        for attempt in 1..=self.max_attempts {
            tracing::debug!(url = %url, attempt, ?state, "issuing request");
            let response = self.transport.send(&request).await?;

            if !response.is_payment_required() {
                let terminal = if response.status.is_success() {
                    HandshakeState::Success
                } else {
                    HandshakeState::Rejected
                };
                transition(&mut state, terminal, &url);
                tracing::debug!(url = %url, status = %response.status, attempt, "handshake finished");
                return Ok(FetchOutcome {
                    response,
                    state,
                    attempts: attempt,
                    authorization,
                });
            }

            transition(&mut state, HandshakeState::AwaitingPayment, &url);
            if attempt == self.max_attempts {
                break;
            }

            let demand = self
                .parser
                .parse(&response.headers, &response.json_body())?
                .with_request_context(&url, request.method.as_str());
            tracing::info!(
                url = %url,
                amount = %demand.amount,
                asset = %demand.asset,
                network = %demand.network,
                "payment required"
            );

            let token = self.signer.authorize(&demand)?;
            transition(&mut state, HandshakeState::Signed, &url);

            let value = HeaderValue::from_str(&encode_token(&token)?).map_err(|e| {
                X402Error::TransportFailure(format!("authorization is not a valid header value: {e}"))
            })?;
            request
                .headers
                .insert(HeaderName::from_static(PAYMENT_HEADER), value);
            authorization = Some(token);
            transition(&mut state, HandshakeState::Retried, &url);
        }

        transition(&mut state, HandshakeState::Exhausted, &url);
        tracing::warn!(url = %url, attempts = self.max_attempts, "payment retries exceeded");
        Err(X402Error::RetriesExceeded {
            url,
            attempts: self.max_attempts,
        })
    }
}

fn transition(state: &mut HandshakeState, next: HandshakeState, url: &str) {
    tracing::trace!(url = %url, from = ?*state, to = ?next, "handshake transition");
    *state = next;
}

/// [`Transport`] backed by `reqwest`. Redirects are not followed, so a 402
/// is always seen by the handshake rather than swallowed by a redirect hop.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, X402Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| X402Error::TransportFailure(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Create a transport with a custom reqwest::Client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, X402Error> {
        let mut req = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(ref body) = request.body {
            req = req.body(body.clone());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| X402Error::TransportFailure(format!("request failed: {e}")))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| X402Error::TransportFailure(format!("failed to read body: {e}")))?
            .to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
