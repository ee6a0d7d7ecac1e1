//! Privacy-preserving classification audit records.
//!
//! Every classification, successful or degraded, can be recorded with a
//! content hash of the input text instead of the raw text. The crate only
//! produces the record shape; persistence belongs to the caller.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::ClassificationResult;

/// Outcome recorded for a classification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Error,
}

/// Audit trail entry for one classification.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub ticket_id: u64,
    pub model: String,
    /// `hashed:<sha256>:<len>` digest of the input text.
    pub prompt: String,
    /// The structured classification, minus free-text reasoning.
    pub response: serde_json::Value,
    pub confidence: Option<f64>,
    pub processing_time_ms: Option<u64>,
    pub status: AuditStatus,
    pub error_message: Option<String>,
}

impl AuditRecord {
    /// Record a successful classification.
    pub fn success(ticket_id: u64, text: &str, result: &ClassificationResult) -> Self {
        Self {
            ticket_id,
            model: result.model.clone(),
            prompt: hash_prompt(text),
            response: redacted_response(result),
            confidence: Some(result.confidence),
            processing_time_ms: result.processing_time_ms,
            status: AuditStatus::Success,
            error_message: None,
        }
    }

    /// Record a failed classification attempt.
    pub fn failure(ticket_id: u64, text: &str, model: &str, error_message: &str) -> Self {
        Self {
            ticket_id,
            model: model.to_string(),
            prompt: hash_prompt(text),
            response: serde_json::Value::Null,
            confidence: None,
            processing_time_ms: None,
            status: AuditStatus::Error,
            error_message: Some(error_message.to_string()),
        }
    }
}

/// Digest the prompt as `hashed:<sha256>:<len>` so the audit trail never
/// stores raw ticket text.
pub fn hash_prompt(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("hashed:{digest}:{}", text.len())
}

/// Serialize a classification with the reasoning field stripped.
fn redacted_response(result: &ClassificationResult) -> serde_json::Value {
    let mut value = serde_json::to_value(result).unwrap_or(serde_json::Value::Null);
    if let Some(map) = value.as_object_mut() {
        map.remove("reasoning");
    }
    value
}
