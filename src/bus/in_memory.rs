//! In-memory bus for tests and single-process setups.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::{BusMessage, PublishError, Transport};

#[derive(Debug, Default)]
struct FaultPlan {
    /// Publish attempts seen so far, successful or not.
    attempts: usize,
    /// 1-based attempt numbers that fail.
    failing_attempts: HashSet<usize>,
    failing_topics: HashSet<String>,
    closed: bool,
}

/// Thread-safe in-memory message log implementing [`Transport`].
///
/// Clones share the same log, so a test can keep one handle while the
/// publisher owns another. Each subscriber created through
/// [`InMemoryBus::new_subscriber`] reads the log from its own position.
///
/// ## Example
///
/// ```
/// use txn_notify::bus::{BusMessage, InMemoryBus, Transport};
///
/// let bus = InMemoryBus::new();
/// let mut transport = bus.clone();
/// transport.publish(&BusMessage::new("my_channel", b"{}".to_vec())).unwrap();
///
/// let message = bus.poll(10).unwrap();
/// assert_eq!(message.topic, "my_channel");
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryBus {
    log: Arc<RwLock<Vec<BusMessage>>>,
    position: Arc<Mutex<usize>>,
    faults: Arc<Mutex<FaultPlan>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a subscriber that shares the log but has its own read position.
    pub fn new_subscriber(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            position: Arc::new(Mutex::new(0)),
            faults: Arc::clone(&self.faults),
        }
    }

    /// Make the `n`-th publish attempt (1-based, counted across all topics) fail.
    pub fn fail_attempt(&self, n: usize) {
        self.faults().failing_attempts.insert(n);
    }

    /// Make every publish to `topic` fail.
    pub fn fail_topic(&self, topic: impl Into<String>) {
        self.faults().failing_topics.insert(topic.into());
    }

    /// Number of publish attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.faults().attempts
    }

    pub fn is_closed(&self) -> bool {
        self.faults().closed
    }

    /// All delivered messages in publish order.
    pub fn messages(&self) -> Vec<BusMessage> {
        self.log().clone()
    }

    /// Delivered messages for one topic.
    pub fn messages_on(&self, topic: &str) -> Vec<BusMessage> {
        self.log()
            .iter()
            .filter(|message| message.topic == topic)
            .cloned()
            .collect()
    }

    /// Payloads of all delivered messages, as text.
    pub fn payloads(&self) -> Vec<String> {
        self.log()
            .iter()
            .map(|message| String::from_utf8_lossy(&message.payload).into_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    /// Wait up to `timeout_ms` for the next unread message.
    pub fn poll(&self, timeout_ms: u64) -> Option<BusMessage> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            {
                let log = self.log();
                let mut position = self.position.lock().unwrap_or_else(PoisonError::into_inner);
                if *position < log.len() {
                    let message = log[*position].clone();
                    *position += 1;
                    return Some(message);
                }
            }

            if Instant::now() >= deadline {
                return None;
            }

            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Clear the log, read position and fault plan.
    pub fn clear(&self) {
        self.log.write().unwrap_or_else(PoisonError::into_inner).clear();
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = 0;
        *self.faults() = FaultPlan::default();
    }

    fn log(&self) -> std::sync::RwLockReadGuard<'_, Vec<BusMessage>> {
        self.log.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, FaultPlan> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for InMemoryBus {
    fn publish(&mut self, message: &BusMessage) -> Result<(), PublishError> {
        {
            let mut faults = self.faults.lock().map_err(|_| PublishError::LockPoisoned)?;
            if faults.closed {
                return Err(PublishError::NotConnected);
            }
            faults.attempts += 1;
            let attempt = faults.attempts;
            if faults.failing_attempts.contains(&attempt) {
                return Err(PublishError::Transport(format!(
                    "injected failure on attempt {}",
                    attempt
                )));
            }
            if faults.failing_topics.contains(&message.topic) {
                return Err(PublishError::Rejected(format!(
                    "topic {} is failing",
                    message.topic
                )));
            }
        }

        self.log
            .write()
            .map_err(|_| PublishError::LockPoisoned)?
            .push(message.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), PublishError> {
        self.faults.lock().map_err(|_| PublishError::LockPoisoned)?.closed = true;
        Ok(())
    }
}
