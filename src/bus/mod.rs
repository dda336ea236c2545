//! Message bus transports.
//!
//! The publisher only sees the [`Transport`] trait: one blocking
//! `publish(topic, payload)` per notification and a `close` at shutdown.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ Publisher (process-wide, one connection)      │
//! │  - routes record -> topic                     │
//! │  - serializes access to the transport         │
//! └────────────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌─────────────┐  ┌───────────────┐  ┌─────────────────┐
//! │ InMemoryBus │  │ NatsTransport │  │ EmitterTransport│
//! │ (included)  │  │ (nats)        │  │ (emitter)       │
//! └─────────────┘  └───────────────┘  └─────────────────┘
//! ```

#[cfg(feature = "emitter")]
mod emitter;
mod error;
mod in_memory;
#[cfg(feature = "nats")]
mod nats;
mod transport;

#[cfg(feature = "emitter")]
pub use emitter::EmitterTransport;
pub use error::{ConnectionError, PublishError};
pub use in_memory::InMemoryBus;
#[cfg(feature = "nats")]
pub use nats::NatsTransport;
pub use transport::{connect_transport, BusMessage, Transport};
