pub mod bus;
pub mod capture;
pub mod config;
pub mod notification;
mod notifier;
pub mod outbox;
pub mod publisher;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod transaction;

pub use capture::{CaptureHook, Column, FiredBy, InvocationError, Row, RowEvent, RowEventKind, Value};
pub use config::{load_config, BrokerConfig, ConfigError, NotifyConfig, TableRoute};
pub use notification::{NotificationPayload, NotificationRecord, PayloadEncoding};
pub use notifier::{InitError, Notifier};
pub use outbox::OutboxBuffer;
pub use publisher::{PublishFailure, Publisher, TopicRouter};
pub use transaction::{
    FlushReport, LifecycleCoordinator, TransactionContext, TransactionEvent, TransactionId,
    TransactionState,
};

// Re-export the EventEmitter so callers can register listeners for EmitterTransport
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
