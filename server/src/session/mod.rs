//! Session management for broker clients
//!
//! This module handles:
//! - Tracking every connected client and its topic subscriptions
//! - Fan-out of published payloads to subscribers
//! - Heartbeat monitoring and dead session detection

mod connection;
mod manager;

pub use connection::{ClientSession, SessionHandle};
pub use manager::SessionManager;
