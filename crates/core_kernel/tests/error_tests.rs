//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::FieldValue;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_serialization() {
    let error = CoreError::serialization("float NaN has no JSON representation");

    match error {
        CoreError::Serialization(msg) => assert!(msg.contains("NaN")),
        _ => panic!("Expected Serialization error"),
    }
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Doctor not found");

    match error {
        CoreError::NotFound(msg) => assert_eq!(msg, "Doctor not found"),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn test_core_error_display() {
    let error = CoreError::configuration("missing table");
    assert_eq!(error.to_string(), "Configuration error: missing table");
}

#[test]
fn test_non_finite_float_fails_json_encoding() {
    let error = FieldValue::Float(f64::INFINITY).to_json().unwrap_err();
    assert!(matches!(error, CoreError::Serialization(_)));
}
