#![warn(missing_docs)]
//! # cropscope-diagnosis-contract
//!
//! ## Purpose
//! Defines the analysis service response schema and client-side parsing
//! helpers.
//!
//! ## Responsibilities
//! - Parse diagnosis response payloads with forward-compatible defaults.
//! - Parse optional error bodies attached to non-2xx responses.
//! - Map wire severity strings to UI-safe severity tiers.
//!
//! ## Data flow
//! Raw JSON response -> [`parse_diagnosis_response`] -> presenter rendering.
//! Non-2xx body -> [`parse_error_body`] -> user-facing error message.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs to avoid borrowing from transient network
//! buffers.
//!
//! ## Error model
//! Invalid JSON for a 2xx body returns [`ContractError`]; for failure bodies
//! absence of a parseable `error` field is tolerated and reported as `None`.
//!
//! ## Notes
//! Every diagnosis field is optional. The service is a moving model target
//! and the client must not crash on missing or newly added fields; default
//! text lives with the presenter, not here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Diagnosis record returned by the analysis service on success.
///
/// All fields are optional and pass through to the presenter untouched; the
/// core never validates or interprets them beyond forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagnosisRecord {
    /// Disease name.
    pub disease: Option<String>,
    /// Severity tier as reported by the model (`"Low"`, `"Medium"`, `"High"`).
    pub severity: Option<String>,
    /// Confidence percentage in [0, 100].
    pub confidence: Option<f32>,
    /// Recommended treatment text.
    pub treatment: Option<String>,
    /// Affected-crops text.
    pub affected_crops: Option<String>,
    /// Prevention text.
    pub prevention: Option<String>,
    /// Ordered list of next-step strings.
    pub next_steps: Option<Vec<String>>,
}

/// Error body optionally attached to non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Server-provided failure reason.
    pub error: String,
}

/// Health probe body served by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    /// Service status string; `"serving"` when healthy.
    pub status: String,
}

/// UI-safe severity tier abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityTier {
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Missing or unrecognized severity string.
    Unknown,
}

/// Parses a successful analysis response body.
///
/// # Errors
/// Returns [`ContractError::Decode`] when the body is not valid JSON for the
/// diagnosis shape. Unknown fields are ignored; missing fields default to
/// `None`.
pub fn parse_diagnosis_response(raw: &[u8]) -> Result<DiagnosisRecord, ContractError> {
    serde_json::from_slice(raw).map_err(ContractError::Decode)
}

/// Extracts the `error` string from a non-2xx response body, if present.
///
/// Absence of a body or an unparseable body yields `None`; the caller falls
/// back to a generic status-coded message.
pub fn parse_error_body(raw: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(raw)
        .ok()
        .map(|body| body.error)
        .filter(|message| !message.trim().is_empty())
}

/// Parses the `/health` probe body.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON.
pub fn parse_health_body(raw: &[u8]) -> Result<HealthBody, ContractError> {
    serde_json::from_slice(raw).map_err(ContractError::Decode)
}

/// Maps the wire severity string to a severity tier, case-insensitively.
pub fn severity_tier(record: &DiagnosisRecord) -> SeverityTier {
    match record.severity.as_deref() {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "low" => SeverityTier::Low,
            "medium" => SeverityTier::Medium,
            "high" => SeverityTier::High,
            _ => SeverityTier::Unknown,
        },
        None => SeverityTier::Unknown,
    }
}

/// Diagnosis contract errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// JSON decode failure for a body that must parse.
    #[error("diagnosis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}
