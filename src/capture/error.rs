use thiserror::Error;

use super::RowEventKind;

/// Capture failures. Fatal to the current statement; the host decides what
/// happens to the transaction.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The hook was called by something other than a row-level change trigger.
    #[error("not called by a row-level change trigger")]
    OutsideTrigger,

    #[error("not fired by insert or update (got {0})")]
    UnsupportedEvent(RowEventKind),

    #[error("row event carries no table name")]
    MissingTable,

    #[error("row event on {0} carries no new row")]
    MissingRow(String),

    #[error("cannot read column {column} of {table}")]
    UnreadableColumn { table: String, column: String },

    #[error("failed to encode notification for {table}: {reason}")]
    Encoding { table: String, reason: String },
}
