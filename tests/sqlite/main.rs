#![cfg(feature = "sqlite")]

use std::sync::Arc;

use rusqlite::Connection;
use txn_notify::bus::InMemoryBus;
use txn_notify::sqlite::{BindingError, SqliteBinding};
use txn_notify::{Notifier, NotifyConfig, TableRoute};

struct Fixture {
    conn: Connection,
    bus: InMemoryBus,
    binding: SqliteBinding,
}

fn fixture_with(config: NotifyConfig) -> Fixture {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE orders (value TEXT UNIQUE, qty INTEGER, receipt BLOB)")
        .unwrap();

    let bus = InMemoryBus::new();
    let notifier = Notifier::with_transport(config, Box::new(bus.clone())).unwrap();
    let binding = SqliteBinding::attach(&conn, Arc::new(notifier)).unwrap();
    binding
        .install_trigger(&conn, "orders", &["value", "qty", "receipt"])
        .unwrap();

    Fixture { conn, bus, binding }
}

fn fixture() -> Fixture {
    fixture_with(NotifyConfig::default())
}

impl Fixture {
    fn batch(&self, sql: &str) {
        self.binding.execute_batch(&self.conn, sql).unwrap();
    }

    fn stored_values(&self) -> Vec<String> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM orders ORDER BY rowid")
            .unwrap();
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        values
    }
}

#[test]
fn committed_inserts_are_published_in_order() {
    let f = fixture();

    f.batch(
        "BEGIN;
         INSERT INTO orders (value, qty) VALUES ('A1', 1);
         INSERT INTO orders (value, qty) VALUES ('A2', 2);
         COMMIT;",
    );

    assert_eq!(
        f.bus.payloads(),
        vec![
            r#"{"table":"orders","data":"A1"}"#,
            r#"{"table":"orders","data":"A2"}"#,
        ]
    );
    assert_eq!(f.binding.pending(), 0);
}

#[test]
fn nothing_is_published_before_commit() {
    let f = fixture();

    f.batch("BEGIN");
    f.binding
        .execute(&f.conn, "INSERT INTO orders (value, qty) VALUES ('A1', 1)", [])
        .unwrap();

    assert_eq!(f.binding.pending(), 1);
    assert!(f.bus.is_empty());

    f.batch("COMMIT");
    assert_eq!(f.bus.len(), 1);
}

#[test]
fn rolled_back_inserts_are_discarded() {
    let f = fixture();

    f.batch(
        "BEGIN;
         INSERT INTO orders (value, qty) VALUES ('A1', 1);
         INSERT INTO orders (value, qty) VALUES ('A2', 2);
         ROLLBACK;",
    );

    assert!(f.bus.is_empty());
    assert_eq!(f.bus.attempts(), 0);
    assert_eq!(f.binding.pending(), 0);
}

#[test]
fn autocommit_statement_is_its_own_transaction() {
    let f = fixture();

    f.conn
        .execute("INSERT INTO orders (value, qty) VALUES ('A1', 1)", [])
        .unwrap();
    f.conn
        .execute("UPDATE orders SET value = 'A1-updated' WHERE qty = 1", [])
        .unwrap();

    assert_eq!(
        f.bus.payloads(),
        vec![
            r#"{"table":"orders","data":"A1"}"#,
            r#"{"table":"orders","data":"A1-updated"}"#,
        ]
    );
}

#[test]
fn deletes_are_not_captured() {
    let f = fixture();
    f.conn
        .execute("INSERT INTO orders (value, qty) VALUES ('A1', 1)", [])
        .unwrap();

    f.conn.execute("DELETE FROM orders", []).unwrap();

    assert_eq!(f.bus.len(), 1);
}

#[test]
fn transactions_after_a_rollback_start_clean() {
    let f = fixture();

    f.batch("BEGIN; INSERT INTO orders (value) VALUES ('lost'); ROLLBACK;");
    f.batch("BEGIN; INSERT INTO orders (value) VALUES ('kept'); COMMIT;");

    assert_eq!(f.bus.payloads(), vec![r#"{"table":"orders","data":"kept"}"#]);
}

#[test]
fn column_values_are_rendered() {
    let mut config = NotifyConfig::default();
    config.tables.insert(
        "orders".to_string(),
        TableRoute {
            columns: vec!["value".to_string(), "qty".to_string(), "receipt".to_string()],
            topic: Some("orders.changed".to_string()),
        },
    );
    let f = fixture_with(config);

    f.conn
        .execute(
            "INSERT INTO orders (value, qty, receipt) VALUES (NULL, 3, x'010203')",
            [],
        )
        .unwrap();

    let message = f.bus.poll(10).unwrap();
    assert_eq!(message.topic, "orders.changed");

    let body: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
    let data: serde_json::Value = serde_json::from_str(body["data"].as_str().unwrap()).unwrap();
    assert_eq!(data["value"], serde_json::Value::Null);
    assert_eq!(data["qty"], "3");
    assert_eq!(data["receipt"], "AQID");
}

#[test]
fn failed_statement_inside_transaction_drops_only_its_rows() {
    let f = fixture();

    f.batch("BEGIN; INSERT INTO orders (value) VALUES ('A1');");
    let result = f.binding.execute(
        &f.conn,
        "INSERT INTO orders (value) VALUES ('ghost'), ('ghost')",
        [],
    );
    assert!(matches!(result, Err(BindingError::Sqlite(_))));
    assert!(!f.conn.is_autocommit());
    assert_eq!(f.binding.pending(), 1);

    f.batch("INSERT INTO orders (value) VALUES ('real'); COMMIT;");

    assert_eq!(f.stored_values(), vec!["A1", "real"]);
    assert_eq!(
        f.bus.payloads(),
        vec![
            r#"{"table":"orders","data":"A1"}"#,
            r#"{"table":"orders","data":"real"}"#,
        ]
    );
}

#[test]
fn failing_batch_keeps_earlier_statements() {
    let f = fixture();

    let result = f.binding.execute_batch(
        &f.conn,
        "BEGIN;
         INSERT INTO orders (value) VALUES ('B1');
         INSERT INTO orders (value) VALUES ('ghost'), ('ghost');
         INSERT INTO orders (value) VALUES ('never');",
    );
    assert!(result.is_err());
    assert_eq!(f.binding.pending(), 1);

    f.batch("COMMIT");

    assert_eq!(f.stored_values(), vec!["B1"]);
    assert_eq!(f.bus.payloads(), vec![r#"{"table":"orders","data":"B1"}"#]);
}

#[test]
fn failed_autocommit_statement_publishes_nothing() {
    let f = fixture();

    let result = f.binding.execute(
        &f.conn,
        "INSERT INTO orders (value) VALUES ('ghost'), ('ghost')",
        [],
    );
    assert!(result.is_err());
    assert_eq!(f.binding.pending(), 0);

    f.binding
        .execute(&f.conn, "INSERT INTO orders (value) VALUES ('real')", [])
        .unwrap();

    assert_eq!(f.stored_values(), vec!["real"]);
    assert_eq!(f.bus.payloads(), vec![r#"{"table":"orders","data":"real"}"#]);
}

#[test]
fn direct_call_outside_trigger_fails() {
    let f = fixture();

    let result: rusqlite::Result<Option<String>> = f.conn.query_row(
        "SELECT txn_notify_capture('INSERT', 'orders', 'value', 'forged')",
        [],
        |row| row.get(0),
    );
    assert!(result.is_err());

    let result: rusqlite::Result<Option<String>> = f.conn.query_row(
        "SELECT txn_notify_capture('0000000000000000', 'INSERT', 'orders', 'value', 'forged')",
        [],
        |row| row.get(0),
    );
    assert!(result.is_err());
    assert_eq!(f.binding.pending(), 0);

    f.binding
        .execute(&f.conn, "INSERT INTO orders (value) VALUES ('real')", [])
        .unwrap();
    assert_eq!(f.bus.payloads(), vec![r#"{"table":"orders","data":"real"}"#]);
}

#[test]
fn reinstalling_triggers_keeps_a_single_capture() {
    let f = fixture();

    f.binding
        .install_trigger(&f.conn, "orders", &["value"])
        .unwrap();
    f.batch("INSERT INTO orders (value) VALUES ('A1')");

    assert_eq!(f.bus.payloads(), vec![r#"{"table":"orders","data":"A1"}"#]);
}

#[test]
fn trigger_requires_columns() {
    let f = fixture();
    assert!(matches!(
        f.binding.install_trigger(&f.conn, "orders", &[]),
        Err(BindingError::NoColumns(table)) if table == "orders"
    ));
}

#[test]
fn detach_stops_capture_and_publishing() {
    let f = fixture();

    SqliteBinding::drop_trigger(&f.conn, "orders").unwrap();
    f.binding.detach(&f.conn).unwrap();

    f.conn
        .execute_batch("BEGIN; INSERT INTO orders (value) VALUES ('A1'); COMMIT;")
        .unwrap();

    assert!(f.bus.is_empty());
    assert!(f
        .conn
        .query_row("SELECT txn_notify_capture('INSERT', 'orders', 'value', 'x')", [], |row| {
            row.get::<_, Option<String>>(0)
        })
        .is_err());
}
