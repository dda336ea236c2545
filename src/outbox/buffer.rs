use std::mem;

use crate::notification::NotificationRecord;

/// Ordered, append-only collection of pending notifications for one transaction.
#[derive(Debug, Default)]
pub struct OutboxBuffer {
    records: Vec<NotificationRecord>,
}

impl OutboxBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record after every record already buffered.
    pub fn append(&mut self, record: NotificationRecord) {
        self.records.push(record);
    }

    /// Take every buffered record in insertion order, leaving the buffer empty.
    pub fn drain_all(&mut self) -> Vec<NotificationRecord> {
        mem::take(&mut self.records)
    }

    /// Drop every record appended after the first `len`, returning how many
    /// were dropped. A `len` at or past the end leaves the buffer unchanged.
    pub fn truncate(&mut self, len: usize) -> usize {
        let dropped = self.records.len().saturating_sub(len);
        self.records.truncate(len);
        dropped
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Buffered records, oldest first.
    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }
}
