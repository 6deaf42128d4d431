//! Broker subscription for the bridge's topic
//!
//! This module handles:
//! - Persistent broker connections with automatic reconnection
//! - Re-subscribing to the topic after every reconnect
//! - Heartbeat management

mod manager;

pub use manager::{ConnectionConfig, ConnectionEvent, ConnectionManager};
