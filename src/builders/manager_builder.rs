//! Fluent construction of a [`PinManager`].

use std::sync::Arc;

use tracing::Span;

use crate::config::PinManagerConfig;
use crate::core::{PinError, PinExecutor, PinManager, StatusHook};

/// Builder collecting the collaborators and settings of a [`PinManager`].
///
/// ```rust,ignore
/// let manager = PinManagerBuilder::new(Arc::new(IpfsPinner))
///     .status_hook(Arc::new(ContentStatusWriter::new(db)))
///     .config(PinManagerConfig::new().with_queue_data_dir("/var/lib/shuttle/pinqueue"))
///     .build()?;
/// ```
pub struct PinManagerBuilder {
    executor: Arc<dyn PinExecutor>,
    hook: Option<Arc<dyn StatusHook>>,
    config: PinManagerConfig,
    span: Option<Span>,
}

impl PinManagerBuilder {
    /// Start with the pin function and default configuration.
    #[must_use]
    pub fn new(executor: Arc<dyn PinExecutor>) -> Self {
        Self {
            executor,
            hook: None,
            config: PinManagerConfig::default(),
            span: None,
        }
    }

    /// Hook notified when a job fails.
    #[must_use]
    pub fn status_hook(mut self, hook: Arc<dyn StatusHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: PinManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Log under `span` instead of one derived from the configured name.
    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Configuration collected so far.
    #[must_use]
    pub const fn current_config(&self) -> &PinManagerConfig {
        &self.config
    }

    /// Open the backlog and assemble the manager.
    ///
    /// # Errors
    ///
    /// See [`PinManager::new`].
    pub fn build(self) -> Result<PinManager, PinError> {
        match self.span {
            Some(span) => PinManager::with_span(self.executor, self.hook, self.config, span),
            None => PinManager::new(self.executor, self.hook, self.config),
        }
    }
}
