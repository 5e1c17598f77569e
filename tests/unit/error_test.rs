//! Tests for error types

use std::time::Duration;

use pin_scheduler::core::PinError;

#[test]
fn test_missing_queue_dir_error() {
    let err = PinError::MissingQueueDir;
    assert_eq!(format!("{}", err), "queue data dir is not set");
}

#[test]
fn test_deadline_exceeded_error() {
    let err = PinError::DeadlineExceeded(Duration::from_millis(250));
    assert_eq!(format!("{}", err), "deadline exceeded after 250ms");
}

#[test]
fn test_execution_error() {
    let err = PinError::Execution("no providers for content".to_string());
    assert_eq!(format!("{}", err), "pin execution failed: no providers for content");
}

#[test]
fn test_status_hook_error_keeps_cause() {
    let err = PinError::StatusHook {
        hook: "database unavailable".to_string(),
        cause: "pin execution failed: boom".to_string(),
    };
    let rendered = format!("{}", err);
    assert!(rendered.contains("database unavailable"));
    assert!(rendered.contains("while reporting: pin execution failed: boom"));
}

#[test]
fn test_io_error_converts() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let err: PinError = io.into();
    assert!(matches!(err, PinError::Io(_)));
    assert_eq!(format!("{}", err), "io error: read-only");
}

#[test]
fn test_serialization_error_converts() {
    let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: PinError = parse.into();
    assert!(matches!(err, PinError::Serialization(_)));
}

#[test]
fn test_channel_closed_error() {
    let err = PinError::ChannelClosed("dispatch");
    assert_eq!(format!("{}", err), "channel closed: dispatch");
}
