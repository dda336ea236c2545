use std::collections::HashMap;

use tracing::debug;

use crate::config::NotifyConfig;
use crate::notification::{NotificationPayload, NotificationRecord, PayloadEncoding};
use crate::transaction::TransactionContext;

use super::{FiredBy, InvocationError, Row, RowEvent, RowEventKind};

/// Entry point invoked by the host for each qualifying row change.
///
/// The hook reads the table name and the configured column(s) of the new row,
/// encodes a [`NotificationPayload`] and appends it to the outbox of the
/// transaction the row belongs to. It performs no I/O and never alters the row.
///
/// Column policy: tables without a configured column list publish the first
/// column of the row. A single configured column publishes that value; several
/// columns publish a JSON object of `name -> value` as the `data` text.
#[derive(Clone, Debug, Default)]
pub struct CaptureHook {
    columns: HashMap<String, Vec<String>>,
    encoding: PayloadEncoding,
}

impl CaptureHook {
    pub fn new(encoding: PayloadEncoding) -> Self {
        Self {
            columns: HashMap::new(),
            encoding,
        }
    }

    /// Build a hook using the encoding and per-table column lists of `config`.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let columns = config
            .tables
            .iter()
            .filter(|(_, route)| !route.columns.is_empty())
            .map(|(table, route)| (table.clone(), route.columns.clone()))
            .collect();

        Self {
            columns,
            encoding: config.encoding,
        }
    }

    /// Publish the named columns for `table` instead of the first column.
    pub fn with_columns<I, S>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .insert(table.into(), columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    /// Capture one row event into `ctx`'s outbox and hand the row back untouched.
    pub fn capture(
        &self,
        ctx: &mut TransactionContext,
        event: RowEvent,
    ) -> Result<Row, InvocationError> {
        if event.fired_by != FiredBy::RowTrigger {
            return Err(InvocationError::OutsideTrigger);
        }

        match event.kind {
            RowEventKind::Insert | RowEventKind::Update => {}
            other => return Err(InvocationError::UnsupportedEvent(other)),
        }

        let table = event
            .table
            .filter(|table| !table.is_empty())
            .ok_or(InvocationError::MissingTable)?;
        let row = event
            .new_row
            .ok_or_else(|| InvocationError::MissingRow(table.clone()))?;

        let record = self.build_record(&table, &row)?;
        ctx.append(record);

        debug!(
            table = %table,
            kind = %event.kind,
            transaction = %ctx.id(),
            buffered = ctx.outbox().len(),
            "captured row change"
        );

        Ok(row)
    }

    /// Encode the notification record for one row of `table`.
    pub fn build_record(&self, table: &str, row: &Row) -> Result<NotificationRecord, InvocationError> {
        let data = self.render_data(table, row)?;
        let payload = NotificationPayload::new(table, data)
            .encode(self.encoding)
            .map_err(|err| InvocationError::Encoding {
                table: table.to_string(),
                reason: err.to_string(),
            })?;

        Ok(NotificationRecord::new(table, payload))
    }

    fn render_data(&self, table: &str, row: &Row) -> Result<Option<String>, InvocationError> {
        let unreadable = |column: &str| InvocationError::UnreadableColumn {
            table: table.to_string(),
            column: column.to_string(),
        };

        match self.columns.get(table).map(Vec::as_slice) {
            None | Some([]) => row
                .first()
                .map(|column| column.value.render())
                .ok_or_else(|| unreadable("#1")),
            Some([name]) => row
                .get(name)
                .map(|value| value.render())
                .ok_or_else(|| unreadable(name)),
            Some(names) => {
                let mut object = serde_json::Map::new();
                for name in names {
                    let value = row.get(name).ok_or_else(|| unreadable(name))?;
                    let rendered = value
                        .render()
                        .map_or(serde_json::Value::Null, serde_json::Value::String);
                    object.insert(name.clone(), rendered);
                }
                serde_json::to_string(&object)
                    .map(Some)
                    .map_err(|err| InvocationError::Encoding {
                        table: table.to_string(),
                        reason: err.to_string(),
                    })
            }
        }
    }
}
