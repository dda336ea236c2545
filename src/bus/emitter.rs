use event_emitter_rs::EventEmitter;

use super::{BusMessage, PublishError, Transport};

/// In-process transport that emits each message through an [`EventEmitter`].
///
/// The topic is the event name and the payload is delivered as a `String`,
/// so listeners are registered as `emitter.on(topic, |body: String| ..)`
/// before the emitter is handed over. Binary payloads are rejected.
pub struct EmitterTransport {
    emitter: EventEmitter,
}

impl EmitterTransport {
    pub fn new(emitter: EventEmitter) -> Self {
        EmitterTransport { emitter }
    }

    /// Register further listeners after the transport is built.
    pub fn emitter_mut(&mut self) -> &mut EventEmitter {
        &mut self.emitter
    }
}

impl Transport for EmitterTransport {
    fn publish(&mut self, message: &BusMessage) -> Result<(), PublishError> {
        let body = message.payload_str().ok_or_else(|| {
            PublishError::Rejected("emitter transport only carries UTF-8 payloads".to_string())
        })?;
        self.emitter.emit(&message.topic, body.to_string());
        Ok(())
    }
}
