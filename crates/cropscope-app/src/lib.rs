#![warn(missing_docs)]
//! # cropscope-app
//!
//! ## Purpose
//! Orchestrates capture, normalization, analysis, and UI state for
//! `cropscope`.
//!
//! ## Responsibilities
//! - Drive the capture controller (camera lifecycle, file selection).
//! - Run the analysis coordinator state machine with stale-response
//!   bookkeeping.
//! - Read runtime configuration (analyze endpoint, capture kill switch).
//!
//! ## Data flow
//! User action -> [`CaptureController`] (camera session manager +
//! canonicalizer) -> normalized asset held by the
//! [`AnalysisCoordinator`] -> analyze trigger -> multipart request ->
//! diagnosis or classified error -> view projection.
//!
//! ## Ownership and lifetimes
//! The coordinator owns the controller, which owns the asset and camera
//! session; everything releases on reset and on drop, so no hardware stream
//! or preview handle outlives its pipeline cycle.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Recoverable kinds (device
//! unavailable, undecodable file, transport/server failures) are converted to
//! user messages at the coordinator boundary; `NoActiveSession` marks a logic
//! bug and propagates.

mod controller;
mod coordinator;

pub use controller::CaptureController;
pub use coordinator::{
    AnalysisCoordinator, AnalysisTicket, CAMERA_UNAVAILABLE_MESSAGE, UNSUPPORTED_FORMAT_MESSAGE,
};

use thiserror::Error;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("CROPSCOPE_VERSION");

/// Default analyze endpoint for local development.
pub const DEFAULT_ANALYZE_ENDPOINT: &str = "http://localhost:5000/analyze";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Returns the analyze endpoint from `CROPSCOPE_ANALYZE_ENDPOINT`.
///
/// Falls back to [`DEFAULT_ANALYZE_ENDPOINT`] when unset or blank.
pub fn analyze_endpoint_from_env() -> String {
    match std::env::var("CROPSCOPE_ANALYZE_ENDPOINT") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => DEFAULT_ANALYZE_ENDPOINT.to_string(),
    }
}

/// Checks the runtime capture kill-switch env var.
///
/// Semantics:
/// - Unset => capture enabled.
/// - `0`, `false`, `off` (case-insensitive) => capture disabled.
/// - Any other value => capture enabled.
pub fn capture_enabled_from_env() -> bool {
    match std::env::var("CROPSCOPE_CAPTURE_ENABLED") {
        Ok(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !(normalized == "0" || normalized == "false" || normalized == "off")
        }
        Err(_) => true,
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Camera subsystem error.
    #[error("camera error: {0}")]
    Camera(cropscope_camera::CameraError),
    /// Canonicalizer error.
    #[error("canonicalizer error: {0}")]
    Canonical(cropscope_canonical::CanonicalError),
    /// Analysis client error.
    #[error("analysis error: {0}")]
    Analysis(#[from] cropscope_analysis::AnalysisError),
    /// Core model error.
    #[error("core error: {0}")]
    Core(#[from] cropscope_core::CoreError),
}
