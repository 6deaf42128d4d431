//! Remote-control abstraction for the TV

use super::RemoteAction;
use anyhow::Result;
use async_trait::async_trait;

/// A session with the TV's remote-control interface
///
/// Calls are not serialized: overlapping plans may interleave their
/// presses at the device.
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// Perform one discrete button press
    async fn send_action(&self, action: RemoteAction) -> Result<()>;

    /// Switch the TV to the content/source identified by `uri`
    async fn select_content(&self, uri: &str) -> Result<()>;

    /// Human-readable name for logs
    fn name(&self) -> &'static str;
}
