/// One captured row change, ready to be published.
///
/// Records are immutable once built: the buffer only appends and drains them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationRecord {
    table: String,
    payload: Vec<u8>,
}

impl NotificationRecord {
    /// Create a record for `table` carrying an already encoded payload.
    pub fn new(table: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            table: table.into(),
            payload,
        }
    }

    /// Create a record with a string payload.
    pub fn with_string_payload(table: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::new(table, payload.into().into_bytes())
    }

    /// Name of the table the change was captured on.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Wire payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
