//! Publisher: the single process-wide handle on the message bus.

mod error;
mod publisher;
mod router;

pub use error::PublishFailure;
pub use publisher::Publisher;
pub use router::TopicRouter;
