//! `synthesize_task` handling: a Merkle provenance artifact over verified data.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use x402::{MerkleTree, X402Error};

use crate::messages::{Artifact, SynthesizeTask, TaskResult};
use crate::scout::content_hash;

/// Leaf hashes for `verified_data`.
///
/// Chunks carrying a non-empty `hash` contribute it verbatim. When no chunk
/// carries one, every chunk is hashed instead.
pub fn data_hashes(verified_data: &[Value]) -> Vec<String> {
    let declared: Vec<String> = verified_data
        .iter()
        .filter_map(|chunk| chunk.get("hash").and_then(Value::as_str))
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect();
    if !declared.is_empty() {
        return declared;
    }
    verified_data.iter().map(content_hash).collect()
}

/// Distinct `agentId`s across chunks, sorted.
pub fn contributors(verified_data: &[Value]) -> Vec<String> {
    verified_data
        .iter()
        .filter_map(|chunk| chunk.get("agentId").and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Build the artifact for `task` as of `now`.
pub fn build_artifact(task: &SynthesizeTask, now: DateTime<Utc>) -> Result<Artifact, X402Error> {
    let hashes = data_hashes(&task.verified_data);
    let tree = MerkleTree::build(hashes.iter().map(String::as_bytes));
    let proofs = (0..tree.leaf_count())
        .map(|i| tree.proof(i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Artifact {
        merkle_root: tree.root_hex(),
        data_hashes: hashes,
        proofs,
        contributors: contributors(&task.verified_data),
        data_count: task.verified_data.len(),
        created_at: now.timestamp(),
    })
}

pub fn synthesize(agent_id: &str, task: &SynthesizeTask) -> TaskResult {
    tracing::info!(
        quest_id = %task.quest_id,
        chunks = task.verified_data.len(),
        objective = %task.objective,
        "building provenance artifact"
    );
    match build_artifact(task, Utc::now()) {
        Ok(artifact) => {
            tracing::info!(quest_id = %task.quest_id, root = %artifact.merkle_root, "artifact built");
            TaskResult {
                artifact: Some(artifact),
                ..TaskResult::complete(&task.quest_id, agent_id)
            }
        }
        Err(e) => {
            tracing::error!(quest_id = %task.quest_id, error = %e, "synthesis failed");
            TaskResult::failed(&task.quest_id, agent_id, e.to_string())
        }
    }
}
