#![warn(missing_docs)]
//! # cropscope-ui
//!
//! ## Purpose
//! Defines the UI-facing projection of the pipeline: which controls are
//! live, what status text shows, and the fully defaulted diagnosis card.
//!
//! ## Responsibilities
//! - Project the current [`cropscope_core::PipelinePhase`] into control
//!   enablement flags so overlapping triggers are impossible.
//! - Render a [`cropscope_diagnosis_contract::DiagnosisRecord`] into a
//!   display model with a complete default for every optional field.
//!
//! ## Data flow
//! Coordinator state -> [`project_view`] -> rendered shell. Diagnosis record
//! -> [`DiagnosisCard::from_record`] -> result card.
//!
//! ## Ownership and lifetimes
//! Projection output owns all of its strings so the shell never borrows from
//! coordinator state across event turns.
//!
//! ## Error model
//! Pure projection; no recoverable errors. Missing diagnosis fields are
//! replaced with defaults, never surfaced as failures.

use cropscope_core::PipelinePhase;
use cropscope_diagnosis_contract::{DiagnosisRecord, SeverityTier, severity_tier};

/// Default shown when the service omits the disease name.
pub const DEFAULT_DISEASE: &str = "Unknown condition";

/// Default shown when the service omits the treatment text.
pub const DEFAULT_TREATMENT: &str = "Consult a local agriculture expert for treatment options.";

/// Default shown when the service omits the affected-crops text.
pub const DEFAULT_AFFECTED_CROPS: &str = "Various vegetable and fruit crops";

/// Default shown when the service omits the prevention text.
pub const DEFAULT_PREVENTION: &str =
    "Maintain proper irrigation and ensure secondary airflow between plants.";

/// Default next steps when the service omits the list.
pub const DEFAULT_NEXT_STEPS: [&str; 3] = [
    "Isolate affected plants immediately",
    "Consult with a local agriculture expert",
    "Monitor surrounding crops for similar symptoms",
];

/// Fully defaulted, display-ready diagnosis.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisCard {
    /// Disease name.
    pub disease: String,
    /// Severity tier for badge styling.
    pub severity: SeverityTier,
    /// Severity label text.
    pub severity_label: String,
    /// Confidence percentage, clamped to [0, 100].
    pub confidence_pct: u8,
    /// Treatment text.
    pub treatment: String,
    /// Affected-crops text.
    pub affected_crops: String,
    /// Prevention text.
    pub prevention: String,
    /// Ordered next-step strings, never empty.
    pub next_steps: Vec<String>,
}

impl DiagnosisCard {
    /// Builds a card from a raw record, filling every absent field.
    pub fn from_record(record: &DiagnosisRecord) -> Self {
        let severity = severity_tier(record);
        let severity_label = match severity {
            SeverityTier::Low => "Low",
            SeverityTier::Medium => "Medium",
            SeverityTier::High => "High",
            SeverityTier::Unknown => "Unknown",
        }
        .to_string();

        let confidence_pct = record
            .confidence
            .map(|value| value.clamp(0.0, 100.0).round() as u8)
            .unwrap_or(0);

        let next_steps = match &record.next_steps {
            Some(steps) if !steps.is_empty() => steps.clone(),
            _ => DEFAULT_NEXT_STEPS.iter().map(|step| step.to_string()).collect(),
        };

        Self {
            disease: text_or(&record.disease, DEFAULT_DISEASE),
            severity,
            severity_label,
            confidence_pct,
            treatment: text_or(&record.treatment, DEFAULT_TREATMENT),
            affected_crops: text_or(&record.affected_crops, DEFAULT_AFFECTED_CROPS),
            prevention: text_or(&record.prevention, DEFAULT_PREVENTION),
            next_steps,
        }
    }
}

fn text_or(value: &Option<String>, default: &str) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.clone(),
        _ => default.to_string(),
    }
}

/// Control enablement and status projection for the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Whether capture-triggering controls (camera/file buttons) are live.
    pub capture_controls_enabled: bool,
    /// Whether the analyze button is visible.
    pub analyze_visible: bool,
    /// Whether a blocking in-progress indicator shows.
    pub busy: bool,
    /// Whether the result card shows.
    pub result_visible: bool,
    /// Error text to display, when present.
    pub error_message: Option<String>,
}

/// Projects phase + error text into the shell view state.
///
/// Capture controls go dead during any suspended operation so a second tap
/// cannot overlap an in-flight one.
pub fn project_view(phase: PipelinePhase, error_message: Option<&str>) -> ViewState {
    let busy = phase == PipelinePhase::Analyzing;
    ViewState {
        capture_controls_enabled: matches!(
            phase,
            PipelinePhase::Idle | PipelinePhase::ImageSelected | PipelinePhase::Error
        ),
        analyze_visible: matches!(phase, PipelinePhase::ImageSelected | PipelinePhase::Error),
        busy,
        result_visible: phase == PipelinePhase::Result,
        error_message: error_message.map(str::to_string),
    }
}
