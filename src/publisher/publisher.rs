use std::sync::Mutex;

use tracing::info;

use crate::bus::{BusMessage, PublishError, Transport};
use crate::notification::NotificationRecord;

use super::{PublishFailure, TopicRouter};

/// Delivers notification records over the process-wide bus connection.
///
/// The connection is created once at initialization and closed once at
/// shutdown. Each publish call holds the connection lock, so transactions
/// committing concurrently from different threads never interleave on the
/// transport. A publisher without a connection is inert: every publish
/// fails with [`PublishError::NotConnected`].
///
/// There is no retry and no staging: a failed publish is reported to the
/// caller and the message is gone.
pub struct Publisher {
    connection: Mutex<Option<Box<dyn Transport>>>,
    router: TopicRouter,
}

impl Publisher {
    pub fn new(transport: Box<dyn Transport>, router: TopicRouter) -> Self {
        Self::from_transport(Some(transport), router)
    }

    /// A publisher with no broker configured.
    pub fn inert(router: TopicRouter) -> Self {
        Self::from_transport(None, router)
    }

    pub fn from_transport(transport: Option<Box<dyn Transport>>, router: TopicRouter) -> Self {
        Self {
            connection: Mutex::new(transport),
            router,
        }
    }

    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .map(|connection| connection.is_some())
            .unwrap_or(false)
    }

    /// Publish one record on the topic routed for its table.
    pub fn publish(&self, record: &NotificationRecord) -> Result<(), PublishFailure> {
        let topic = self.router.topic_for(record.table());
        self.publish_to(topic, record.payload())
            .map_err(|source| PublishFailure {
                table: record.table().to_string(),
                topic: topic.to_string(),
                source,
            })
    }

    /// Publish raw payload bytes to `topic`.
    pub fn publish_to(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let mut connection = self
            .connection
            .lock()
            .map_err(|_| PublishError::LockPoisoned)?;
        let transport = connection.as_mut().ok_or(PublishError::NotConnected)?;
        transport.publish(&BusMessage::new(topic, payload.to_vec()))
    }

    /// Close the connection. Later publishes fail as if no broker was configured.
    pub fn close(&self) -> Result<(), PublishError> {
        let transport = self
            .connection
            .lock()
            .map_err(|_| PublishError::LockPoisoned)?
            .take();

        match transport {
            Some(mut transport) => {
                transport.close()?;
                info!("closed broker connection");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
