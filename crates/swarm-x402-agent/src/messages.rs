//! Dispatcher wire messages, one JSON object per WebSocket text frame,
//! tagged by `type`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use x402::Proof;

/// Which task family this agent serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Scout,
    Verifier,
    Synthesizer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scout => "scout",
            Self::Verifier => "verifier",
            Self::Synthesizer => "synthesizer",
        }
    }

    /// Capabilities advertised in the registration frame.
    pub fn capabilities(self) -> Vec<String> {
        let caps: &[&str] = match self {
            Self::Scout => &["api_query", "document_fetch", "x402_payment"],
            Self::Verifier => &["hash_verification", "data_integrity"],
            Self::Synthesizer => &["merkle_provenance", "artifact_generation"],
        };
        caps.iter().map(|c| c.to_string()).collect()
    }

    /// The inbound task `type` this role answers.
    pub fn task_type(self) -> &'static str {
        match self {
            Self::Scout => "query_quest",
            Self::Verifier => "verify_task",
            Self::Synthesizer => "synthesize_task",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scout" => Ok(Self::Scout),
            "verifier" => Ok(Self::Verifier),
            "synthesizer" => Ok(Self::Synthesizer),
            other => Err(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    QueryQuest(QueryQuest),
    VerifyTask(VerifyTask),
    SynthesizeTask(SynthesizeTask),
    Ping,
}

/// Fetch a list of (possibly paywalled) sources.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryQuest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub quest_id: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Spending ceiling in asset base units. Informational only; values
    /// that are not a non-negative integer read as `None`.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub budget: Option<u64>,
}

/// Re-check declared content hashes of fetched chunks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTask {
    #[serde(default, deserialize_with = "lenient_id")]
    pub quest_id: String,
    #[serde(default)]
    pub data: Vec<DataChunk>,
    /// When non-empty, a chunk's declared hash must also appear here.
    #[serde(default)]
    pub expected_hashes: Vec<String>,
}

/// A fetched item as reported by a scout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataChunk {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub hash: String,
}

/// Build a provenance artifact over verified data chunks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeTask {
    #[serde(default, deserialize_with = "lenient_id")]
    pub quest_id: String,
    #[serde(default = "unknown_objective")]
    pub objective: String,
    #[serde(default)]
    pub verified_data: Vec<Value>,
}

fn unknown_objective() -> String {
    "Unknown objective".to_string()
}

/// Identifier given as a string or a number.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(id_text(&Value::deserialize(deserializer)?))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

const INBOUND_TYPES: &[&str] = &["query_quest", "verify_task", "synthesize_task", "ping"];

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not JSON: {0}")]
    NotJson(serde_json::Error),

    #[error("invalid {kind} frame: {source}")]
    InvalidBody {
        kind: String,
        /// Best-effort `questId` of the rejected frame, for the error reply.
        quest_id: String,
        source: serde_json::Error,
    },
}

/// Decode one inbound frame.
///
/// `Ok(None)` means the frame is JSON but carries a `type` this agent does
/// not handle; such frames are ignored rather than treated as errors.
pub fn parse_inbound(text: &str) -> Result<Option<Inbound>, FrameError> {
    let value: Value = serde_json::from_str(text).map_err(FrameError::NotJson)?;
    let Some(kind) = value
        .get("type")
        .and_then(Value::as_str)
        .filter(|t| INBOUND_TYPES.contains(t))
        .map(str::to_string)
    else {
        return Ok(None);
    };

    let quest_id = value.get("questId").map(id_text).unwrap_or_default();
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| FrameError::InvalidBody {
            kind,
            quest_id,
            source,
        })
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Register(Registration),
    TaskResult(TaskResult),
    Pong {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub role: Role,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Complete,
    /// Verification passed for (nearly) every chunk.
    Verified,
    /// Verification passed for only some chunks.
    Partial,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub quest_id: String,
    pub agent_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SourceResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proofs: Option<Vec<PaymentProof>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_hashes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub(crate) fn empty(quest_id: &str, agent_id: &str, status: TaskStatus) -> Self {
        Self {
            quest_id: quest_id.to_string(),
            agent_id: agent_id.to_string(),
            status,
            results: None,
            payment_proofs: None,
            data_hashes: None,
            verification: None,
            artifact: None,
            error: None,
        }
    }

    pub fn complete(quest_id: &str, agent_id: &str) -> Self {
        Self::empty(quest_id, agent_id, TaskStatus::Complete)
    }

    pub fn failed(quest_id: &str, agent_id: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(quest_id, agent_id, TaskStatus::Error)
        }
    }
}

/// Outcome of fetching a single source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceResult {
    Fetched {
        source: String,
        data: Value,
        /// SHA-256 hex of the compact JSON encoding of `data`.
        hash: String,
        /// Unix seconds.
        timestamp: i64,
    },
    Failed {
        source: String,
        error: String,
    },
}

impl SourceResult {
    pub fn source(&self) -> &str {
        match self {
            Self::Fetched { source, .. } | Self::Failed { source, .. } => source,
        }
    }

    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Fetched { hash, .. } => Some(hash),
            Self::Failed { .. } => None,
        }
    }
}

/// Evidence that a source was paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub source: String,
    pub payer: String,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
}

/// Hash re-check report for a `verify_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub verified_chunks: Vec<String>,
    pub failed_chunks: Vec<String>,
    /// Percentage of chunks that verified, 0..=100.
    pub confidence_score: u8,
    /// SHA-256 hex over the concatenated verified hashes.
    pub data_hash: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Provenance artifact for a synthesis task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub merkle_root: String,
    pub data_hashes: Vec<String>,
    /// One inclusion proof per entry of `data_hashes`, same order.
    pub proofs: Vec<Proof>,
    pub contributors: Vec<String>,
    pub data_count: usize,
    /// Unix seconds.
    pub created_at: i64,
}
