use std::fmt;

/// Lifecycle events delivered by the host transaction manager.
///
/// Only [`TransactionEvent::Commit`] and [`TransactionEvent::Abort`] drive the
/// outbox; every other event is observed and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionEvent {
    /// The transaction committed; its outcome is final.
    Commit,
    /// The transaction rolled back.
    Abort,
    PreCommit,
    Prepare,
    SavepointStart,
    SavepointCommit,
    SavepointAbort,
}

impl TransactionEvent {
    /// Whether this event ends the whole transaction.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionEvent::Commit | TransactionEvent::Abort)
    }
}

impl fmt::Display for TransactionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionEvent::Commit => "commit",
            TransactionEvent::Abort => "abort",
            TransactionEvent::PreCommit => "pre-commit",
            TransactionEvent::Prepare => "prepare",
            TransactionEvent::SavepointStart => "savepoint-start",
            TransactionEvent::SavepointCommit => "savepoint-commit",
            TransactionEvent::SavepointAbort => "savepoint-abort",
        };
        f.write_str(name)
    }
}
