use std::sync::Arc;
use std::thread;

use txn_notify::bus::InMemoryBus;
use txn_notify::{
    NotificationPayload, Notifier, NotifyConfig, PayloadEncoding, Row, RowEvent, TableRoute,
    TransactionEvent, TransactionState,
};

fn notifier_with(config: NotifyConfig) -> (InMemoryBus, Notifier) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let bus = InMemoryBus::new();
    let notifier = Notifier::with_transport(config, Box::new(bus.clone())).unwrap();
    (bus, notifier)
}

fn notifier() -> (InMemoryBus, Notifier) {
    notifier_with(NotifyConfig::default())
}

fn order(value: &str) -> RowEvent {
    RowEvent::insert("orders", Row::new().with("value", value))
}

fn data_of(bus: &InMemoryBus) -> Vec<Option<String>> {
    bus.messages()
        .iter()
        .map(|m| {
            NotificationPayload::decode(&m.payload, PayloadEncoding::Json)
                .unwrap()
                .data
        })
        .collect()
}

// --- Scenarios ---

#[test]
fn commit_delivers_both_orders_on_configured_topic() {
    let (bus, notifier) = notifier();
    let mut txn = notifier.begin();

    notifier.capture(&mut txn, order("A1")).unwrap();
    notifier.capture(&mut txn, order("A2")).unwrap();
    assert!(bus.is_empty(), "nothing is visible before commit");

    notifier.handle(TransactionEvent::Commit, &mut txn);

    let messages = bus.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.topic == "my_channel"));
    assert_eq!(
        bus.payloads(),
        vec![
            r#"{"table":"orders","data":"A1"}"#,
            r#"{"table":"orders","data":"A2"}"#,
        ]
    );
}

#[test]
fn abort_delivers_nothing() {
    let (bus, notifier) = notifier();
    let mut txn = notifier.begin();

    notifier.capture(&mut txn, order("A1")).unwrap();
    notifier.capture(&mut txn, order("A2")).unwrap();
    let report = notifier.handle(TransactionEvent::Abort, &mut txn);

    assert_eq!(report.discarded, 2);
    assert_eq!(bus.attempts(), 0);
    assert!(txn.outbox().is_empty());
    assert_eq!(txn.state(), TransactionState::Idle);
}

// --- Properties ---

#[test]
fn commit_preserves_capture_order_without_loss_or_duplicates() {
    let (bus, notifier) = notifier();
    let mut txn = notifier.begin();

    let values: Vec<String> = (0..50).map(|i| format!("v{}", i)).collect();
    for value in &values {
        notifier.capture(&mut txn, order(value)).unwrap();
    }
    let report = notifier.handle(TransactionEvent::Commit, &mut txn);

    assert_eq!(report.published, 50);
    let expected: Vec<Option<String>> = values.into_iter().map(Some).collect();
    assert_eq!(data_of(&bus), expected);
}

#[test]
fn commit_of_one_transaction_never_flushes_another() {
    let (bus, notifier) = notifier();
    let mut a = notifier.begin();
    let mut b = notifier.begin();

    notifier.capture(&mut a, order("from-a")).unwrap();
    notifier.capture(&mut b, order("from-b")).unwrap();

    notifier.handle(TransactionEvent::Commit, &mut b);
    assert_eq!(data_of(&bus), vec![Some("from-b".to_string())]);
    assert_eq!(a.outbox().len(), 1);

    notifier.handle(TransactionEvent::Abort, &mut a);
    assert_eq!(bus.len(), 1);
}

#[test]
fn second_commit_without_new_captures_publishes_nothing() {
    let (bus, notifier) = notifier();
    let mut txn = notifier.begin();
    notifier.capture(&mut txn, order("A1")).unwrap();

    notifier.handle(TransactionEvent::Commit, &mut txn);
    let report = notifier.handle(TransactionEvent::Commit, &mut txn);

    assert!(report.is_empty());
    assert_eq!(bus.attempts(), 1);
}

#[test]
fn failed_publish_does_not_block_later_records() {
    let (bus, notifier) = notifier();
    bus.fail_attempt(2);

    let mut txn = notifier.begin();
    for value in ["A1", "A2", "A3", "A4"] {
        notifier.capture(&mut txn, order(value)).unwrap();
    }
    let report = notifier.handle(TransactionEvent::Commit, &mut txn);

    assert_eq!(report.attempted, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(bus.attempts(), 4);
    assert_eq!(
        data_of(&bus),
        vec![
            Some("A1".to_string()),
            Some("A3".to_string()),
            Some("A4".to_string()),
        ]
    );
}

#[test]
fn savepoint_events_do_not_flush() {
    let (bus, notifier) = notifier();
    let mut txn = notifier.begin();
    notifier.capture(&mut txn, order("A1")).unwrap();

    notifier.handle(TransactionEvent::SavepointAbort, &mut txn);
    notifier.handle(TransactionEvent::PreCommit, &mut txn);
    assert!(bus.is_empty());
    assert_eq!(txn.state(), TransactionState::Accumulating);

    notifier.handle(TransactionEvent::Commit, &mut txn);
    assert_eq!(bus.len(), 1);
}

#[test]
fn capture_error_leaves_earlier_records_buffered() {
    let (bus, notifier) = notifier();
    let mut txn = notifier.begin();

    notifier.capture(&mut txn, order("A1")).unwrap();
    assert!(notifier
        .capture(&mut txn, RowEvent::insert("orders", Row::new()))
        .is_err());
    assert_eq!(txn.outbox().len(), 1);

    notifier.handle(TransactionEvent::Abort, &mut txn);
    assert!(bus.is_empty());
}

// --- Routing and encoding ---

#[test]
fn table_routes_pick_topic_and_columns() {
    let mut config = NotifyConfig::default();
    config.tables.insert(
        "audit".to_string(),
        TableRoute {
            columns: vec!["actor".to_string()],
            topic: Some("audit.events".to_string()),
        },
    );
    let (bus, notifier) = notifier_with(config);

    let mut txn = notifier.begin();
    notifier.capture(&mut txn, order("A1")).unwrap();
    notifier
        .capture(
            &mut txn,
            RowEvent::insert("audit", Row::new().with("id", 1_i64).with("actor", "alice")),
        )
        .unwrap();
    notifier.handle(TransactionEvent::Commit, &mut txn);

    assert_eq!(bus.messages_on("my_channel").len(), 1);
    let audit = bus.messages_on("audit.events");
    assert_eq!(audit.len(), 1);
    assert_eq!(
        audit[0].payload_str(),
        Some(r#"{"table":"audit","data":"alice"}"#)
    );
}

#[test]
fn bitcode_encoding_is_used_on_the_wire() {
    let mut config = NotifyConfig::default();
    config.encoding = PayloadEncoding::Bitcode;
    let (bus, notifier) = notifier_with(config);

    let mut txn = notifier.begin();
    notifier.capture(&mut txn, order("A1")).unwrap();
    notifier.handle(TransactionEvent::Commit, &mut txn);

    let message = bus.poll(10).unwrap();
    let payload = NotificationPayload::decode(&message.payload, PayloadEncoding::Bitcode).unwrap();
    assert_eq!(payload, NotificationPayload::new("orders", Some("A1".to_string())));
}

// --- Concurrency ---

#[test]
fn concurrent_commits_keep_each_batch_in_order() {
    let (bus, notifier) = notifier();
    let notifier = Arc::new(notifier);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let notifier = Arc::clone(&notifier);
            thread::spawn(move || {
                let mut txn = notifier.begin();
                for i in 0..25 {
                    notifier
                        .capture(&mut txn, order(&format!("{}-{}", worker, i)))
                        .unwrap();
                }
                notifier.handle(TransactionEvent::Commit, &mut txn)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().published, 25);
    }

    let data: Vec<String> = data_of(&bus).into_iter().flatten().collect();
    assert_eq!(data.len(), 100);
    for worker in 0..4 {
        let prefix = format!("{}-", worker);
        let batch: Vec<usize> = data
            .iter()
            .filter_map(|d| d.strip_prefix(&prefix))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(batch, (0..25).collect::<Vec<_>>());
    }
}

// --- Shutdown ---

#[test]
fn commit_after_shutdown_reports_failures_only() {
    let (bus, notifier) = notifier();
    notifier.shutdown();

    let mut txn = notifier.begin();
    notifier.capture(&mut txn, order("A1")).unwrap();
    let report = notifier.handle(TransactionEvent::Commit, &mut txn);

    assert_eq!(report.failed, 1);
    assert!(bus.is_empty());
    assert!(txn.outbox().is_empty());
}
