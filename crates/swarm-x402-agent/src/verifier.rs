//! `verify_task` handling: re-hash each chunk and compare with its declared hash.

use chrono::{DateTime, Utc};

use crate::messages::{DataChunk, TaskResult, TaskStatus, Verification, VerifyTask};
use crate::scout::{content_hash, hex_digest};

/// Minimum confidence for a `verified` status; anything lower is `partial`.
pub const VERIFIED_THRESHOLD: u8 = 95;

fn chunk_verifies(chunk: &DataChunk, expected: &[String]) -> bool {
    if chunk.hash.is_empty() || !content_hash(&chunk.data).eq_ignore_ascii_case(&chunk.hash) {
        return false;
    }
    expected.is_empty() || expected.iter().any(|e| e.eq_ignore_ascii_case(&chunk.hash))
}

/// Share of verified chunks as a percentage. No failures means 100, so an
/// empty task is fully verified.
pub fn confidence(verified: usize, failed: usize) -> u8 {
    if failed == 0 {
        return 100;
    }
    let total = verified + failed;
    u8::try_from(verified * 100 / total).unwrap_or(100)
}

pub fn verify_chunks(task: &VerifyTask, now: DateTime<Utc>) -> Verification {
    let (verified, failed): (Vec<&DataChunk>, Vec<&DataChunk>) = task
        .data
        .iter()
        .partition(|chunk| chunk_verifies(chunk, &task.expected_hashes));

    let verified_chunks: Vec<String> = verified.iter().map(|c| c.hash.clone()).collect();
    let failed_chunks: Vec<String> = failed.iter().map(|c| c.hash.clone()).collect();

    Verification {
        confidence_score: confidence(verified_chunks.len(), failed_chunks.len()),
        data_hash: hex_digest(verified_chunks.concat().as_bytes()),
        verified_chunks,
        failed_chunks,
        timestamp: now.timestamp(),
    }
}

pub fn verify(agent_id: &str, task: &VerifyTask) -> TaskResult {
    let verification = verify_chunks(task, Utc::now());
    let status = if verification.confidence_score >= VERIFIED_THRESHOLD {
        TaskStatus::Verified
    } else {
        TaskStatus::Partial
    };
    tracing::info!(
        quest_id = %task.quest_id,
        verified = verification.verified_chunks.len(),
        failed = verification.failed_chunks.len(),
        confidence = verification.confidence_score,
        "verification complete"
    );

    TaskResult {
        verification: Some(verification),
        ..TaskResult::empty(&task.quest_id, agent_id, status)
    }
}
