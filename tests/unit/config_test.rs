//! Tests for configuration validation

use std::time::Duration;

use pin_scheduler::config::manager::{MAX_PIN_DURATION, MIN_STACK_SIZE};
use pin_scheduler::config::{PinManagerConfig, QueueBackendConfig};
use pin_scheduler::core::PinError;

#[test]
fn test_manager_config_defaults() {
    let cfg = PinManagerConfig::default();
    assert_eq!(cfg.max_active_per_user, 15);
    assert_eq!(cfg.queue_backend, QueueBackendConfig::File);
    assert_eq!(cfg.max_pin_duration(), Duration::from_secs(24 * 60 * 60));
    assert!(!cfg.queue_data_dir.as_os_str().is_empty());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_manager_config_missing_queue_dir() {
    let cfg = PinManagerConfig::new().with_queue_data_dir("");
    assert!(matches!(cfg.validate(), Err(PinError::MissingQueueDir)));
}

#[test]
fn test_in_memory_backend_needs_no_dir() {
    let cfg = PinManagerConfig::new()
        .with_queue_data_dir("")
        .with_queue_backend(QueueBackendConfig::InMemory);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_manager_config_invalid_deadline() {
    let mut cfg = PinManagerConfig::new();
    cfg.max_pin_duration_ms = 0;
    assert!(matches!(cfg.validate(), Err(PinError::InvalidConfig(_))));

    let too_long = PinManagerConfig::new().with_max_pin_duration(MAX_PIN_DURATION * 2);
    assert!(matches!(too_long.validate(), Err(PinError::InvalidConfig(_))));
}

#[test]
fn test_manager_config_invalid_stack_size() {
    let mut cfg = PinManagerConfig::new();
    cfg.worker_stack_size = MIN_STACK_SIZE - 1;
    assert!(matches!(cfg.validate(), Err(PinError::InvalidConfig(_))));
}

#[test]
fn test_manager_config_from_json() {
    let cfg = PinManagerConfig::from_json_str(
        r#"{
            "max_active_per_user": 4,
            "queue_data_dir": "/var/lib/shuttle/pinqueue",
            "queue_backend": "in_memory",
            "max_pin_duration_ms": 60000,
            "name": "shuttle-pinner"
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.max_active_per_user, 4);
    assert_eq!(cfg.queue_backend, QueueBackendConfig::InMemory);
    assert_eq!(cfg.max_pin_duration(), Duration::from_secs(60));
    assert_eq!(cfg.name, "shuttle-pinner");
}

#[test]
fn test_manager_config_from_json_rejects_invalid() {
    let err = PinManagerConfig::from_json_str(r#"{"max_pin_duration_ms": 0}"#).unwrap_err();
    assert!(matches!(err, PinError::InvalidConfig(_)));

    let err = PinManagerConfig::from_json_str("max_active_per_user = 3").unwrap_err();
    assert!(matches!(err, PinError::Serialization(_)));
}
