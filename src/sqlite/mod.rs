//! SQLite host binding.
//!
//! SQLite plays the host transaction manager: row triggers call the
//! `txn_notify_capture` SQL function, and the connection's commit and
//! rollback hooks deliver [`TransactionEvent::Commit`] and
//! [`TransactionEvent::Abort`]. A connection runs at most one transaction at
//! a time, so each attached connection owns exactly one
//! [`TransactionContext`], replaced after every commit or rollback.
//!
//! Triggers created by [`SqliteBinding::install_trigger`] pass a token that is
//! private to the attached binding; a call without it is rejected with
//! [`InvocationError::OutsideTrigger`].
//!
//! SQLite rolls back a failed statement without ending an explicit
//! transaction and has no hook for it. Run writes through
//! [`SqliteBinding::execute`] or [`SqliteBinding::execute_batch`] so that the
//! notifications captured by a failed statement are dropped with its rows.
//!
//! ```
//! use std::sync::Arc;
//! use rusqlite::Connection;
//! use txn_notify::bus::InMemoryBus;
//! use txn_notify::sqlite::SqliteBinding;
//! use txn_notify::{NotifyConfig, Notifier};
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch("CREATE TABLE orders (value TEXT)").unwrap();
//!
//! let bus = InMemoryBus::new();
//! let notifier = Notifier::with_transport(NotifyConfig::default(), Box::new(bus.clone())).unwrap();
//! let binding = SqliteBinding::attach(&conn, Arc::new(notifier)).unwrap();
//! binding.install_trigger(&conn, "orders", &["value"]).unwrap();
//!
//! binding
//!     .execute_batch(&conn, "BEGIN; INSERT INTO orders VALUES ('A1'); COMMIT;")
//!     .unwrap();
//! assert_eq!(bus.payloads(), vec![r#"{"table":"orders","data":"A1"}"#]);
//! ```

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Null, ValueRef};
use rusqlite::{Batch, Connection, Params};
use thiserror::Error;
use tracing::debug;

use crate::capture::{FiredBy, InvocationError, Row, RowEvent, RowEventKind, Value};
use crate::notifier::Notifier;
use crate::transaction::{TransactionContext, TransactionEvent};

/// Name of the SQL function row triggers call.
pub const CAPTURE_FUNCTION: &str = "txn_notify_capture";

#[derive(Debug, Error)]
pub enum BindingError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("no columns given for trigger on {0}")]
    NoColumns(String),
}

/// Notifier attached to one SQLite connection.
pub struct SqliteBinding {
    notifier: Arc<Notifier>,
    context: Arc<Mutex<TransactionContext>>,
    token: String,
}

impl SqliteBinding {
    /// Register the capture function and the commit/rollback hooks on `conn`.
    pub fn attach(conn: &Connection, notifier: Arc<Notifier>) -> Result<Self, BindingError> {
        let context = Arc::new(Mutex::new(notifier.begin()));
        let token = attach_token();

        {
            let notifier = Arc::clone(&notifier);
            let context = Arc::clone(&context);
            let token = token.clone();
            conn.create_scalar_function(
                CAPTURE_FUNCTION,
                -1,
                FunctionFlags::SQLITE_UTF8,
                move |ctx| {
                    let event = row_event(ctx, &token)
                        .map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err)))?;
                    notifier
                        .capture(&mut lock(&context), event)
                        .map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err)))?;
                    Ok(Null)
                },
            )?;
        }

        {
            let notifier = Arc::clone(&notifier);
            let context = Arc::clone(&context);
            conn.commit_hook(Some(move || {
                deliver(&notifier, &context, TransactionEvent::Commit);
                false
            }));
        }

        {
            let notifier = Arc::clone(&notifier);
            let context = Arc::clone(&context);
            conn.rollback_hook(Some(move || {
                deliver(&notifier, &context, TransactionEvent::Abort);
            }));
        }

        debug!("attached notifier to sqlite connection");
        Ok(Self {
            notifier,
            context,
            token,
        })
    }

    /// Remove the hooks and the capture function from `conn`.
    ///
    /// Drop the triggers first (see [`SqliteBinding::drop_trigger`]); a
    /// trigger calling the removed function makes its statement fail.
    pub fn detach(&self, conn: &Connection) -> Result<(), BindingError> {
        conn.commit_hook(None::<fn() -> bool>);
        conn.rollback_hook(None::<fn()>);
        conn.remove_function(CAPTURE_FUNCTION, -1)?;

        let discarded = lock(&self.context).outbox().len();
        *lock(&self.context) = self.notifier.begin();
        debug!(discarded, "detached notifier from sqlite connection");
        Ok(())
    }

    /// Execute one statement, dropping what it captured if it fails.
    ///
    /// Inside an explicit transaction a failed statement is rolled back on its
    /// own, so only its notifications are discarded. Outside one, nothing
    /// buffered can still be committed and the whole buffer is discarded.
    pub fn execute<P: Params>(
        &self,
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> Result<usize, BindingError> {
        let mark = lock(&self.context).mark();
        let result = conn.execute(sql, params);
        self.end_statement(conn, mark, result.is_err());
        Ok(result?)
    }

    /// Execute every statement in `sql`, stopping at the first failure.
    ///
    /// Statements before the failing one keep their notifications, exactly as
    /// they keep their rows.
    pub fn execute_batch(&self, conn: &Connection, sql: &str) -> Result<(), BindingError> {
        let mut batch = Batch::new(conn, sql);
        loop {
            let mark = lock(&self.context).mark();
            let result = step_batch(&mut batch);
            self.end_statement(conn, mark, result.is_err());
            if !result? {
                return Ok(());
            }
        }
    }

    fn end_statement(&self, conn: &Connection, mark: usize, failed: bool) {
        let mut ctx = lock(&self.context);
        if conn.is_autocommit() {
            let discarded = ctx.rollback_to(0);
            if discarded > 0 {
                debug!(transaction = %ctx.id(), discarded, "discarded notifications outside a transaction");
            }
        } else if failed {
            let discarded = ctx.rollback_to(mark);
            if discarded > 0 {
                debug!(transaction = %ctx.id(), discarded, "discarded notifications of failed statement");
            }
        }
    }

    /// Notifications buffered by the connection's current transaction.
    pub fn pending(&self) -> usize {
        lock(&self.context).outbox().len()
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Create `AFTER INSERT` and `AFTER UPDATE` row triggers on `table`
    /// passing `columns` of the new row to the capture function.
    ///
    /// Existing triggers for `table` are replaced, so triggers left by an
    /// earlier binding pick up this binding's token.
    pub fn install_trigger(
        &self,
        conn: &Connection,
        table: &str,
        columns: &[&str],
    ) -> Result<(), BindingError> {
        if columns.is_empty() {
            return Err(BindingError::NoColumns(table.to_string()));
        }

        Self::drop_trigger(conn, table)?;
        for kind in [RowEventKind::Insert, RowEventKind::Update] {
            conn.execute_batch(&trigger_sql(table, columns, kind, &self.token))?;
        }
        debug!(table, "installed notify triggers");
        Ok(())
    }

    pub fn drop_trigger(conn: &Connection, table: &str) -> Result<(), BindingError> {
        for kind in [RowEventKind::Insert, RowEventKind::Update] {
            conn.execute_batch(&format!(
                "DROP TRIGGER IF EXISTS {};",
                quote_ident(&trigger_name(table, kind))
            ))?;
        }
        Ok(())
    }
}

fn lock(context: &Mutex<TransactionContext>) -> MutexGuard<'_, TransactionContext> {
    context.lock().unwrap_or_else(PoisonError::into_inner)
}

fn deliver(notifier: &Notifier, context: &Mutex<TransactionContext>, event: TransactionEvent) {
    let mut ctx = lock(context);
    notifier.handle(event, &mut ctx);
    if event.is_terminal() {
        *ctx = notifier.begin();
    }
}

/// Step the next statement of `batch` to completion. `Ok(false)` once the
/// batch is exhausted.
fn step_batch(batch: &mut Batch<'_, '_>) -> rusqlite::Result<bool> {
    let Some(mut stmt) = batch.next()? else {
        return Ok(false);
    };
    let mut rows = stmt.raw_query();
    while rows.next()?.is_some() {}
    Ok(true)
}

fn attach_token() -> String {
    format!("{:016x}", RandomState::new().build_hasher().finish())
}

/// Arguments: token, operation, table, then name/value pairs.
fn row_event(ctx: &Context<'_>, token: &str) -> Result<RowEvent, InvocationError> {
    if ctx.len() < 3 || (ctx.len() - 3) % 2 != 0 {
        return Err(InvocationError::OutsideTrigger);
    }
    match ctx.get_raw(0) {
        ValueRef::Text(passed) if passed == token.as_bytes() => {}
        _ => return Err(InvocationError::OutsideTrigger),
    }

    let kind = match ctx.get_raw(1) {
        ValueRef::Text(b"INSERT") => RowEventKind::Insert,
        ValueRef::Text(b"UPDATE") => RowEventKind::Update,
        ValueRef::Text(b"DELETE") => RowEventKind::Delete,
        _ => return Err(InvocationError::OutsideTrigger),
    };

    let table = match ctx.get_raw(2) {
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        _ => return Err(InvocationError::MissingTable),
    };

    let mut row = Row::new();
    for idx in (3..ctx.len()).step_by(2) {
        let name = match ctx.get_raw(idx) {
            ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            _ => {
                return Err(InvocationError::UnreadableColumn {
                    table,
                    column: format!("#{}", (idx - 1) / 2),
                })
            }
        };
        let value = match ctx.get_raw(idx + 1) {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => return Err(InvocationError::UnreadableColumn { table, column: name }),
            },
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        };
        row.push(name, value);
    }

    Ok(RowEvent {
        kind,
        fired_by: FiredBy::RowTrigger,
        table: Some(table),
        new_row: Some(row),
    })
}

fn trigger_name(table: &str, kind: RowEventKind) -> String {
    format!("txn_notify_{}_{}", table, kind.to_string().to_ascii_lowercase())
}

fn trigger_sql(table: &str, columns: &[&str], kind: RowEventKind, token: &str) -> String {
    let mut args = vec![
        quote_literal(token),
        quote_literal(&kind.to_string()),
        quote_literal(table),
    ];
    for column in columns {
        args.push(quote_literal(column));
        args.push(format!("NEW.{}", quote_ident(column)));
    }

    format!(
        "CREATE TRIGGER {name} AFTER {kind} ON {table} FOR EACH ROW \
         BEGIN SELECT {function}({args}); END;",
        name = quote_ident(&trigger_name(table, kind)),
        kind = kind,
        table = quote_ident(table),
        function = CAPTURE_FUNCTION,
        args = args.join(", "),
    )
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
