//! Tests for utility functions

use pin_scheduler::util::telemetry::{init_tracing, DEFAULT_FILTER};

#[test]
fn test_default_filter_targets_crate() {
    assert!(DEFAULT_FILTER.starts_with("pin_scheduler="));
    assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_FILTER).is_ok());
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    assert!(tracing::dispatcher::has_been_set());
}
