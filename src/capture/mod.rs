//! Change capture: turns a row event from the host into a buffered notification.

mod error;
mod event;
mod hook;
mod row;

pub use error::InvocationError;
pub use event::{FiredBy, RowEvent, RowEventKind};
pub use hook::CaptureHook;
pub use row::{Column, Row, Value};
