//! Transport abstraction for reaching the broker

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tvlink_shared::TransportError;

/// A byte stream to the broker
pub trait BrokerStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> BrokerStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Factory for broker connections
#[async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    /// The stream type this connector produces
    type Stream: BrokerStream;

    /// Attempt to connect, returning a stream on success
    async fn connect(&self) -> Result<Self::Stream, TransportError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;

    /// Where this connector points, for logs
    fn address(&self) -> &str;
}
