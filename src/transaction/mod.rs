//! Transaction lifecycle: per-transaction contexts and the coordinator that
//! flushes or discards their outbox when the host ends the transaction.

mod context;
mod coordinator;
mod event;

pub use context::{TransactionContext, TransactionId, TransactionState};
pub use coordinator::{FlushReport, LifecycleCoordinator};
pub use event::TransactionEvent;
