//! `query_quest` handling: fetch each source through the x402 handshake.

use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};
use x402::{FetchOutcome, PaymentSigner, Transport, TransportResponse, X402Client};

use crate::messages::{PaymentProof, QueryQuest, SourceResult, TaskResult};

/// SHA-256 hex of the compact JSON encoding of `data`.
pub fn content_hash(data: &Value) -> String {
    // Serializing a `Value` cannot fail.
    let bytes = serde_json::to_vec(data).unwrap_or_default();
    hex_digest(&bytes)
}

pub(crate) fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// JSON for JSON responses, text for everything else.
fn response_data(response: &TransportResponse) -> Value {
    let is_json = response
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));
    if is_json {
        if let Ok(value) = serde_json::from_slice(&response.body) {
            return value;
        }
    }
    Value::String(response.text())
}

fn payment_proof(source: &str, outcome: &FetchOutcome) -> Option<PaymentProof> {
    let token = outcome.authorization.as_ref()?;
    Some(PaymentProof {
        source: source.to_string(),
        payer: token.payer.to_checksum(None),
        nonce: token.nonce.clone(),
        receipt: outcome.receipt().map(str::to_string),
    })
}

/// Fetch one source. Never fails: errors become [`SourceResult::Failed`].
pub async fn fetch_source<T, S>(
    client: &X402Client<T, S>,
    source: &str,
) -> (SourceResult, Option<PaymentProof>)
where
    T: Transport,
    S: PaymentSigner,
{
    let outcome = match client.fetch(source, Method::GET).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(source = %source, error = %e, "source fetch failed");
            return (
                SourceResult::Failed {
                    source: source.to_string(),
                    error: e.to_string(),
                },
                None,
            );
        }
    };

    let proof = payment_proof(source, &outcome);
    if !outcome.is_success() {
        tracing::warn!(source = %source, status = %outcome.response.status, "source rejected request");
        let result = SourceResult::Failed {
            source: source.to_string(),
            error: format!("unexpected status {}", outcome.response.status),
        };
        return (result, proof);
    }

    let data = response_data(&outcome.response);
    let hash = content_hash(&data);
    tracing::info!(
        source = %source,
        paid = outcome.paid(),
        attempts = outcome.attempts,
        hash = %hash,
        "source fetched"
    );
    let result = SourceResult::Fetched {
        source: source.to_string(),
        data,
        hash,
        timestamp: Utc::now().timestamp(),
    };
    (result, proof)
}

/// Fetch every source of `quest`, in order, and build the reply.
pub async fn run_quest<T, S>(client: &X402Client<T, S>, agent_id: &str, quest: &QueryQuest) -> TaskResult
where
    T: Transport,
    S: PaymentSigner,
{
    tracing::info!(
        quest_id = %quest.quest_id,
        sources = quest.sources.len(),
        budget = ?quest.budget,
        "running query quest"
    );

    let mut results = Vec::with_capacity(quest.sources.len());
    let mut proofs = Vec::new();
    for source in &quest.sources {
        let (result, proof) = fetch_source(client, source).await;
        results.push(result);
        proofs.extend(proof);
    }

    let data_hashes = results
        .iter()
        .filter_map(SourceResult::hash)
        .map(str::to_string)
        .collect();

    TaskResult {
        results: Some(results),
        payment_proofs: Some(proofs),
        data_hashes: Some(data_hashes),
        ..TaskResult::complete(&quest.quest_id, agent_id)
    }
}
