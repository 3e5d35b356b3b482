//! Integration tests for analysis failure classification and messages.

mod common;

use common::{ScriptedTransport, coordinator_fixture};
use cropscope_analysis::AnalysisClient;
use cropscope_core::PipelinePhase;

#[test]
fn analysis_error_classification_tests_server_error_body_is_surfaced() {
    let (mut coordinator, _previews, _device) = coordinator_fixture();
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "leaf.png")
        .expect("file selection should succeed");

    let transport = ScriptedTransport::always(500, br#"{"error": "model unavailable"}"#);
    let client = AnalysisClient::new("http://localhost:5000/analyze", transport)
        .expect("client should build");

    coordinator.analyze_with(&client);
    assert_eq!(coordinator.phase(), PipelinePhase::Error);
    assert_eq!(
        coordinator.message(),
        Some("Analysis failed: model unavailable")
    );
}

#[test]
fn analysis_error_classification_tests_unparseable_body_falls_back_to_status() {
    let (mut coordinator, _previews, _device) = coordinator_fixture();
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "leaf.png")
        .expect("file selection should succeed");

    let transport = ScriptedTransport::always(502, b"<html>Bad Gateway</html>");
    let client = AnalysisClient::new("http://localhost:5000/analyze", transport)
        .expect("client should build");

    coordinator.analyze_with(&client);
    assert_eq!(coordinator.phase(), PipelinePhase::Error);
    assert_eq!(coordinator.message(), Some("Server error (502)"));
}

#[test]
fn analysis_error_classification_tests_timeout_gets_connectivity_message() {
    let (mut coordinator, _previews, _device) = coordinator_fixture();
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "leaf.png")
        .expect("file selection should succeed");

    let transport = ScriptedTransport::unreachable("request timed out");
    let client = AnalysisClient::new("http://localhost:5000/analyze", transport)
        .expect("client should build");

    coordinator.analyze_with(&client);
    assert_eq!(coordinator.phase(), PipelinePhase::Error);
    assert_eq!(
        coordinator.message(),
        Some("Could not connect to the analysis server. Please ensure the backend is running.")
    );
}

#[test]
fn analysis_error_classification_tests_unreadable_success_body_is_an_error() {
    let (mut coordinator, _previews, _device) = coordinator_fixture();
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "leaf.png")
        .expect("file selection should succeed");

    let transport = ScriptedTransport::always(200, b"not json");
    let client = AnalysisClient::new("http://localhost:5000/analyze", transport)
        .expect("client should build");

    coordinator.analyze_with(&client);
    assert_eq!(coordinator.phase(), PipelinePhase::Error);
    assert_eq!(
        coordinator.message(),
        Some("Analysis failed: the server returned an unreadable response.")
    );
}
