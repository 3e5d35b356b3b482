//! Integration tests for the discard-stale-generation rule.

mod common;

use common::coordinator_fixture;
use cropscope_analysis::AnalysisError;
use cropscope_core::PipelinePhase;
use cropscope_diagnosis_contract::DiagnosisRecord;

fn record_named(disease: &str) -> DiagnosisRecord {
    DiagnosisRecord {
        disease: Some(disease.to_string()),
        ..DiagnosisRecord::default()
    }
}

#[test]
fn stale_response_tests_response_after_reset_is_discarded() {
    let (mut coordinator, _previews, _device) = coordinator_fixture();
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "leaf.png")
        .expect("file selection should succeed");

    let ticket = coordinator.request_analysis().expect("analyze should start");
    coordinator.reset();

    let applied = coordinator.apply_analysis_outcome(ticket, Ok(record_named("Late Blight")));
    assert!(!applied);
    assert_eq!(coordinator.phase(), PipelinePhase::Idle);
    assert!(coordinator.result().is_none());
}

#[test]
fn stale_response_tests_first_response_never_lands_on_second_cycle() {
    let (mut coordinator, _previews, _device) = coordinator_fixture();

    // First cycle: analyze, then move on before the response arrives.
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "first.png")
        .expect("file selection should succeed");
    let first_ticket = coordinator.request_analysis().expect("analyze should start");

    coordinator.reset();
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "second.png")
        .expect("file selection should succeed");
    let second_ticket = coordinator.request_analysis().expect("analyze should start");

    // The first (stale) response arrives late and must be dropped.
    assert!(!coordinator.apply_analysis_outcome(first_ticket, Ok(record_named("Stale Verdict"))));
    assert_eq!(coordinator.phase(), PipelinePhase::Analyzing);

    // The current generation still completes normally.
    assert!(coordinator.apply_analysis_outcome(second_ticket, Ok(record_named("Fresh Verdict"))));
    assert_eq!(coordinator.phase(), PipelinePhase::Result);
    assert_eq!(
        coordinator
            .result()
            .and_then(|record| record.disease.as_deref()),
        Some("Fresh Verdict")
    );
}

#[test]
fn stale_response_tests_stale_error_is_discarded_too() {
    let (mut coordinator, _previews, _device) = coordinator_fixture();
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "leaf.png")
        .expect("file selection should succeed");

    let ticket = coordinator.request_analysis().expect("analyze should start");
    coordinator.reset();

    let applied = coordinator.apply_analysis_outcome(
        ticket,
        Err(AnalysisError::Transport("timed out".to_string())),
    );
    assert!(!applied);
    assert_eq!(coordinator.phase(), PipelinePhase::Idle);
    assert!(coordinator.message().is_none());
}

#[test]
fn stale_response_tests_duplicate_delivery_applies_once() {
    let (mut coordinator, _previews, _device) = coordinator_fixture();
    coordinator
        .pick_from_files(&common::png_bytes(4, 4), "leaf.png")
        .expect("file selection should succeed");

    let ticket = coordinator.request_analysis().expect("analyze should start");
    assert!(coordinator.apply_analysis_outcome(ticket, Ok(record_named("Verdict"))));
    // Second delivery of the same generation is stale by then.
    assert!(!coordinator.apply_analysis_outcome(ticket, Ok(record_named("Echo"))));
    assert_eq!(
        coordinator
            .result()
            .and_then(|record| record.disease.as_deref()),
        Some("Verdict")
    );
}
