//! Notification records: the unit of data buffered per transaction.

mod payload;
mod record;

pub use payload::{EncodeError, NotificationPayload, PayloadEncoding};
pub use record::NotificationRecord;
