//! Transaction-scoped outbox buffer.
//!
//! Rows captured during a transaction are appended here and stay invisible to
//! the bus until the transaction commits. The buffer never talks to the bus
//! itself; the lifecycle coordinator drains it.

mod buffer;

pub use buffer::OutboxBuffer;
