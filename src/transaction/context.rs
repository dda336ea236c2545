use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::notification::NotificationRecord;
use crate::outbox::OutboxBuffer;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local identifier of a transaction context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    fn next() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Outbox state of one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    /// Nothing buffered.
    Idle,
    /// At least one notification waiting for the transaction to end.
    Accumulating,
}

/// Execution context of one in-progress transaction.
///
/// Owns the transaction's outbox buffer. Hosts keep one context per
/// concurrently running transaction and pass it to both the capture hook and
/// the lifecycle coordinator, so a buffer can never be shared between
/// transactions.
#[derive(Debug)]
pub struct TransactionContext {
    id: TransactionId,
    outbox: OutboxBuffer,
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionContext {
    pub fn new() -> Self {
        Self {
            id: TransactionId::next(),
            outbox: OutboxBuffer::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        if self.outbox.is_empty() {
            TransactionState::Idle
        } else {
            TransactionState::Accumulating
        }
    }

    /// Read-only view of the pending notifications.
    pub fn outbox(&self) -> &OutboxBuffer {
        &self.outbox
    }

    /// Position to pass to [`TransactionContext::rollback_to`] to undo
    /// everything captured from here on.
    pub fn mark(&self) -> usize {
        self.outbox.len()
    }

    /// Forget records captured after `mark`, for hosts that roll back a single
    /// statement while the transaction itself stays open.
    pub fn rollback_to(&mut self, mark: usize) -> usize {
        self.outbox.truncate(mark)
    }

    pub(crate) fn append(&mut self, record: NotificationRecord) {
        self.outbox.append(record);
    }

    pub(crate) fn drain(&mut self) -> Vec<NotificationRecord> {
        self.outbox.drain_all()
    }
}
