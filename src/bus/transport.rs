use super::{ConnectionError, InMemoryBus, PublishError};
use crate::config::BrokerConfig;

/// A message as handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Client side of the external message bus.
///
/// Implementations block until the message is handed to the broker (or the
/// attempt failed). Callers serialize access, so `&mut self` is enough.
pub trait Transport: Send {
    /// Publish one message to its topic.
    fn publish(&mut self, message: &BusMessage) -> Result<(), PublishError>;

    /// Release the connection. Later publishes fail with [`PublishError::NotConnected`].
    fn close(&mut self) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Open the transport selected by the broker url's scheme.
///
/// Returns `Ok(None)` when no url is configured: publishing is disabled but
/// capture and buffering keep working.
pub fn connect_transport(
    config: &BrokerConfig,
) -> Result<Option<Box<dyn Transport>>, ConnectionError> {
    let Some(url) = config.url.as_deref() else {
        return Ok(None);
    };

    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| ConnectionError::InvalidUrl(url.to_string()))?;
    if rest.is_empty() && scheme != "memory" {
        return Err(ConnectionError::InvalidUrl(url.to_string()));
    }

    match scheme {
        "memory" => Ok(Some(Box::new(InMemoryBus::new()) as Box<dyn Transport>)),
        #[cfg(feature = "nats")]
        "nats" | "tls" => {
            let transport = super::NatsTransport::connect(config)?;
            Ok(Some(Box::new(transport) as Box<dyn Transport>))
        }
        other => Err(ConnectionError::UnsupportedScheme(other.to_string())),
    }
}
