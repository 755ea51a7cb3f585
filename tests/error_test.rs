//! Tests for error types

use ads_evidence::llm::ParseError;
use ads_evidence::retry::{ExternalCallError, ExternalError};
use ads_evidence::Error;

#[test]
fn test_schema_error() {
    let error = Error::Schema {
        missing: vec!["campaign_name".to_string(), "date".to_string()],
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("missing required identifier column(s): campaign_name, date"));
    assert!(error_str.contains("cannot be segmented"));
    assert!(error.is_fatal());
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("file not found".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_config_error() {
    let error = Error::Config("retry.max_retries must be at least 1".to_string());
    assert_eq!(
        format!("{error}"),
        "Configuration error: retry.max_retries must be at least 1"
    );
}

#[test]
fn test_invalid_transition_error() {
    let error = Error::InvalidTransition {
        from: "done".to_string(),
        to: "validating".to_string(),
    };
    assert_eq!(format!("{error}"), "Invalid run transition: done -> validating");
}

#[test]
fn test_parse_error_is_transparent_and_recoverable() {
    let error = Error::from(ParseError::MissingField("hypotheses".to_string()));
    assert_eq!(
        format!("{error}"),
        "Parse error: response is missing the 'hypotheses' field"
    );
    assert!(!error.is_fatal());
}

#[test]
fn test_exhausted_external_call_is_recoverable() {
    let error = Error::from(ExternalCallError::Exhausted {
        attempts: 3,
        last: ExternalError::server("502 bad gateway"),
    });
    let error_str = format!("{error}");
    assert!(error_str.contains("after 3 attempt(s)"));
    assert!(error_str.contains("server_error: 502 bad gateway"));
    assert!(!error.is_fatal());
}

#[test]
fn test_cancelled_external_call_is_fatal() {
    let error = Error::from(ExternalCallError::Cancelled { attempts: 1 });
    assert!(error.is_fatal());
    assert!(Error::Cancelled.is_fatal());
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
    let error: Error = io.into();
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_serialization_error_conversion() {
    let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json.into();
    assert!(format!("{error}").starts_with("Serialization error"));
}

#[test]
fn test_error_debug() {
    let error = Error::Other("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Other"));
}
