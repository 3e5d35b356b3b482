//! Validates contract fixtures against frozen JSON schemas.

use std::path::PathBuf;

use jsonschema::JSONSchema;
use serde_json::Value;

/// Schema/fixture pairs frozen under the workspace `contracts/` directory.
const CONTRACT_PAIRS: [(&str, &str); 2] = [
    (
        "diagnosis-response.schema.json",
        "fixtures/diagnosis-response.valid.json",
    ),
    (
        "error-response.schema.json",
        "fixtures/error-response.valid.json",
    ),
];

fn contracts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../contracts")
}

fn read_json(relative: &str) -> Value {
    let path = contracts_dir().join(relative);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|error| panic!("{} should be readable: {error}", path.display()));
    serde_json::from_str(&raw)
        .unwrap_or_else(|error| panic!("{} should be valid json: {error}", path.display()))
}

fn validator_for(schema_name: &str) -> JSONSchema {
    JSONSchema::compile(&read_json(schema_name)).expect("schema should compile")
}

#[test]
fn every_fixture_matches_its_schema() {
    for (schema_name, fixture_name) in CONTRACT_PAIRS {
        let validator = validator_for(schema_name);
        let fixture = read_json(fixture_name);
        assert!(
            validator.is_valid(&fixture),
            "{fixture_name} should validate against {schema_name}"
        );
    }
}

#[test]
fn empty_object_is_a_valid_diagnosis() {
    // Every diagnosis field is optional by contract; the presenter supplies
    // defaults.
    let validator = validator_for("diagnosis-response.schema.json");
    assert!(validator.is_valid(&serde_json::json!({})));
}

#[test]
fn blank_error_reason_is_rejected() {
    let validator = validator_for("error-response.schema.json");
    assert!(validator.is_valid(&serde_json::json!({"error": "model unavailable"})));
    assert!(!validator.is_valid(&serde_json::json!({"error": ""})));
    assert!(!validator.is_valid(&serde_json::json!({})));
}
