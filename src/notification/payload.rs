use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire format used for the notification body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// `{"table": "...", "data": "..."}` as UTF-8 JSON.
    #[default]
    Json,
    /// The same document in bitcode binary form.
    Bitcode,
}

impl fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadEncoding::Json => write!(f, "json"),
            PayloadEncoding::Bitcode => write!(f, "bitcode"),
        }
    }
}

impl FromStr for PayloadEncoding {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(PayloadEncoding::Json),
            "bitcode" => Ok(PayloadEncoding::Bitcode),
            other => Err(EncodeError::UnknownEncoding(other.to_string())),
        }
    }
}

/// Errors raised while encoding or decoding a notification body.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bitcode encoding failed: {0}")]
    Bitcode(#[from] bitcode::Error),

    #[error("unknown payload encoding: {0}")]
    UnknownEncoding(String),
}

/// The document published for each committed row change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub table: String,
    /// Rendered column value. `None` when the column was NULL.
    pub data: Option<String>,
}

impl NotificationPayload {
    pub fn new(table: impl Into<String>, data: Option<String>) -> Self {
        Self {
            table: table.into(),
            data,
        }
    }

    /// Encode the document with the given wire format.
    pub fn encode(&self, encoding: PayloadEncoding) -> Result<Vec<u8>, EncodeError> {
        match encoding {
            PayloadEncoding::Json => Ok(serde_json::to_vec(self)?),
            PayloadEncoding::Bitcode => Ok(bitcode::serialize(self)?),
        }
    }

    /// Decode a document previously produced by [`NotificationPayload::encode`].
    pub fn decode(bytes: &[u8], encoding: PayloadEncoding) -> Result<Self, EncodeError> {
        match encoding {
            PayloadEncoding::Json => Ok(serde_json::from_slice(bytes)?),
            PayloadEncoding::Bitcode => Ok(bitcode::deserialize(bytes)?),
        }
    }
}
