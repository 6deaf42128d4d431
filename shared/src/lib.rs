//! TV link shared types
//!
//! This crate provides the normalized command vocabulary and the frame codec
//! used between the cloud-side skill, the broker and the home-side bridge.

pub mod codec;
pub mod vocabulary;

use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub use codec::{CodecError, Frame, FrameDecoder};
pub use vocabulary::{
    topic_for, CommandAction, CommandKind, Namespace, NormalizedCommand, Task, VocabularyError,
};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timing parameters for the broker link
pub mod link {
    /// Default topic root commands are published under
    pub const DEFAULT_TOPIC_ROOT: &str = "tv_topic";

    /// Client heartbeat interval in milliseconds
    pub const HEARTBEAT_INTERVAL_MS: u64 = 5000;

    /// Broker drops a session silent for this long
    pub const HEARTBEAT_TIMEOUT_MS: u64 = 30000;

    /// How long a publisher waits for the broker's PubAck
    pub const PUBLISH_ACK_TIMEOUT_MS: u64 = 3000;
}

/// Failures on the pub/sub channel
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Connection closed by peer")]
    Closed,

    #[error("Broker rejected frame: {0}")]
    Rejected(String),

    #[error("Unexpected {0} frame")]
    Unexpected(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_positive() {
        assert!(now_ms() > 0);
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Rejected("no such topic".into());
        assert_eq!(err.to_string(), "Broker rejected frame: no such topic");
        assert_eq!(TransportError::Timeout(3000).to_string(), "Timed out after 3000ms");
    }
}
