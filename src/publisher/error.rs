use thiserror::Error;

use crate::bus::PublishError;

/// A committed notification that could not be delivered.
///
/// Never affects the transaction: it is reported and the message is lost.
#[derive(Debug, Error)]
#[error("failed to publish notification for {table} to {topic}: {source}")]
pub struct PublishFailure {
    pub table: String,
    pub topic: String,
    #[source]
    pub source: PublishError,
}
