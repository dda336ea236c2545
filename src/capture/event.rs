use std::fmt;

use super::Row;

/// Kind of row change reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowEventKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for RowEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowEventKind::Insert => write!(f, "INSERT"),
            RowEventKind::Update => write!(f, "UPDATE"),
            RowEventKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// How the capture hook was reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FiredBy {
    /// A per-row change trigger. The only context the hook accepts.
    RowTrigger,
    /// A per-statement trigger; there is no row to read.
    StatementTrigger,
    /// Called directly, e.g. as a plain SQL function.
    Direct,
}

/// Descriptor the host hands to the capture hook for one changed row.
#[derive(Clone, Debug, PartialEq)]
pub struct RowEvent {
    pub kind: RowEventKind,
    pub fired_by: FiredBy,
    pub table: Option<String>,
    pub new_row: Option<Row>,
}

impl RowEvent {
    pub fn new(kind: RowEventKind, table: impl Into<String>, new_row: Row) -> Self {
        Self {
            kind,
            fired_by: FiredBy::RowTrigger,
            table: Some(table.into()),
            new_row: Some(new_row),
        }
    }

    pub fn insert(table: impl Into<String>, new_row: Row) -> Self {
        Self::new(RowEventKind::Insert, table, new_row)
    }

    pub fn update(table: impl Into<String>, new_row: Row) -> Self {
        Self::new(RowEventKind::Update, table, new_row)
    }

    /// Override how the event was fired.
    pub fn fired_by(mut self, fired_by: FiredBy) -> Self {
        self.fired_by = fired_by;
        self
    }
}
