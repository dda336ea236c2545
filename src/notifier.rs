use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::bus::{connect_transport, ConnectionError, Transport};
use crate::capture::{CaptureHook, InvocationError, Row, RowEvent};
use crate::config::{ConfigError, NotifyConfig};
use crate::publisher::{Publisher, TopicRouter};
use crate::transaction::{FlushReport, LifecycleCoordinator, TransactionContext, TransactionEvent};

/// Errors that stop the notifier from loading.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Process-level wiring of capture hook, coordinator and publisher.
///
/// Create one at host initialization, hand out a [`TransactionContext`] per
/// transaction with [`Notifier::begin`], feed row events to
/// [`Notifier::capture`] and lifecycle events to [`Notifier::handle`], and
/// call [`Notifier::shutdown`] when the host unloads.
///
/// ## Example
///
/// ```
/// use txn_notify::bus::InMemoryBus;
/// use txn_notify::{NotifyConfig, Notifier, Row, RowEvent, TransactionEvent};
///
/// let bus = InMemoryBus::new();
/// let notifier = Notifier::with_transport(NotifyConfig::default(), Box::new(bus.clone())).unwrap();
///
/// let mut txn = notifier.begin();
/// notifier
///     .capture(&mut txn, RowEvent::insert("orders", Row::new().with("value", "A1")))
///     .unwrap();
/// assert!(bus.is_empty());
///
/// notifier.handle(TransactionEvent::Commit, &mut txn);
/// assert_eq!(bus.payloads(), vec![r#"{"table":"orders","data":"A1"}"#]);
/// ```
pub struct Notifier {
    config: NotifyConfig,
    capture: CaptureHook,
    coordinator: LifecycleCoordinator,
}

impl Notifier {
    /// Validate `config` and connect to the configured broker.
    ///
    /// A configured but unreachable broker fails initialization. Without a
    /// broker url the notifier still captures and buffers, but every commit
    /// flush reports its records as failed.
    pub fn init(config: NotifyConfig) -> Result<Self, InitError> {
        config.validate()?;
        let transport = connect_transport(&config.broker)?;
        if transport.is_none() {
            warn!("no broker url configured, notifications will not be published");
        }
        Ok(Self::build(config, transport))
    }

    /// Initialize with an already connected transport.
    pub fn with_transport(
        config: NotifyConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self, InitError> {
        config.validate()?;
        Ok(Self::build(config, Some(transport)))
    }

    fn build(config: NotifyConfig, transport: Option<Box<dyn Transport>>) -> Self {
        let publisher = Publisher::from_transport(transport, TopicRouter::from_config(&config));
        let coordinator = LifecycleCoordinator::new(Arc::new(publisher));
        let capture = CaptureHook::from_config(&config);

        info!(
            topic = %config.topic,
            encoding = %config.encoding,
            publishing = coordinator.publisher().is_connected(),
            "notifier initialized"
        );

        Self {
            config,
            capture,
            coordinator,
        }
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    pub fn capture_hook(&self) -> &CaptureHook {
        &self.capture
    }

    pub fn coordinator(&self) -> &LifecycleCoordinator {
        &self.coordinator
    }

    pub fn publisher(&self) -> &Publisher {
        self.coordinator.publisher()
    }

    /// Start tracking a new transaction.
    pub fn begin(&self) -> TransactionContext {
        TransactionContext::new()
    }

    /// Capture hook entry point; see [`CaptureHook::capture`].
    pub fn capture(
        &self,
        ctx: &mut TransactionContext,
        event: RowEvent,
    ) -> Result<Row, InvocationError> {
        self.capture.capture(ctx, event)
    }

    /// Lifecycle entry point; see [`LifecycleCoordinator::handle`].
    pub fn handle(&self, event: TransactionEvent, ctx: &mut TransactionContext) -> FlushReport {
        self.coordinator.handle(event, ctx)
    }

    /// Release the broker connection. Safe to call more than once.
    pub fn shutdown(&self) {
        if let Err(err) = self.publisher().close() {
            warn!(error = %err, "failed to close broker connection");
        }
    }
}
