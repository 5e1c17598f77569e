//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pin_scheduler::builders::PinManagerBuilder;
use pin_scheduler::config::{PinManagerConfig, QueueBackendConfig};
use pin_scheduler::core::{AppResult, PinContext, PinError, PinExecutor, PinJob, Progress};

struct NoopPinner;

#[async_trait]
impl PinExecutor for NoopPinner {
    async fn pin(&self, _ctx: PinContext, _job: Arc<PinJob>, _progress: Progress) -> AppResult<()> {
        Ok(())
    }
}

#[test]
fn test_manager_builder_defaults() {
    let builder = PinManagerBuilder::new(Arc::new(NoopPinner));
    assert_eq!(builder.current_config(), &PinManagerConfig::default());
}

#[test]
fn test_manager_builder_applies_config() {
    let manager = PinManagerBuilder::new(Arc::new(NoopPinner))
        .config(
            PinManagerConfig::new()
                .with_queue_backend(QueueBackendConfig::InMemory)
                .with_max_active_per_user(3)
                .with_max_pin_duration(Duration::from_secs(30))
                .with_name("builder-test"),
        )
        .span(tracing::info_span!("custom"))
        .build()
        .unwrap();

    assert_eq!(manager.max_active_per_user(), 3);
    assert_eq!(manager.config().name, "builder-test");
    assert_eq!(manager.config().max_pin_duration(), Duration::from_secs(30));
    assert_eq!(manager.queue_size(), 0);
}

#[test]
fn test_manager_builder_rejects_missing_dir() {
    let result = PinManagerBuilder::new(Arc::new(NoopPinner))
        .config(PinManagerConfig::new().with_queue_data_dir(""))
        .build();
    assert!(matches!(result, Err(PinError::MissingQueueDir)));
}
