//! TCP transport to the broker

use crate::transport::traits::TransportConnector;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tvlink_shared::TransportError;

/// Connects to a broker address over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

#[async_trait]
impl TransportConnector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<Self::Stream, TransportError> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout.as_millis() as u64))??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn name(&self) -> &'static str {
        "Broker"
    }

    fn address(&self) -> &str {
        &self.address
    }
}
