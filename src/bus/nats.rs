//! NATS transport backed by `async-nats`.
//!
//! The client runs on a private current-thread runtime and every call blocks
//! on it, so a commit flush waits until each message is written to the server
//! (or the per-publish timeout elapses).

use std::time::Duration;

use async_nats::{Client, ConnectOptions};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use super::{BusMessage, ConnectionError, PublishError, Transport};
use crate::config::BrokerConfig;

pub struct NatsTransport {
    runtime: Runtime,
    client: Option<Client>,
    url: String,
    publish_timeout: Duration,
}

impl NatsTransport {
    /// Connect to the server named by `config.url`.
    pub fn connect(config: &BrokerConfig) -> Result<Self, ConnectionError> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| ConnectionError::InvalidUrl(String::new()))?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ConnectionError::Runtime(err.to_string()))?;

        let mut options = ConnectOptions::new()
            .connection_timeout(Duration::from_millis(config.connect_timeout_ms));
        if let Some(name) = &config.name {
            options = options.name(name);
        }

        let client = runtime
            .block_on(options.connect(url.as_str()))
            .map_err(|err| ConnectionError::Unreachable {
                url: url.clone(),
                reason: err.to_string(),
            })?;

        info!(url = %url, "connected to NATS server");

        Ok(Self {
            runtime,
            client: Some(client),
            url,
            publish_timeout: Duration::from_millis(config.publish_timeout_ms),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for NatsTransport {
    fn publish(&mut self, message: &BusMessage) -> Result<(), PublishError> {
        let client = self.client.as_ref().ok_or(PublishError::NotConnected)?;
        let subject = message.topic.clone();
        let payload = message.payload.clone();

        self.runtime.block_on(async {
            let send = async {
                client
                    .publish(subject, payload.into())
                    .await
                    .map_err(|err| PublishError::Transport(err.to_string()))?;
                client
                    .flush()
                    .await
                    .map_err(|err| PublishError::Transport(err.to_string()))
            };

            tokio::time::timeout(self.publish_timeout, send)
                .await
                .map_err(|_| PublishError::Timeout)?
        })
    }

    fn close(&mut self) -> Result<(), PublishError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };

        debug!(url = %self.url, "closing NATS connection");
        self.runtime
            .block_on(client.flush())
            .map_err(|err| PublishError::Transport(err.to_string()))
    }
}
