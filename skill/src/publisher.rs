//! Publishing normalized commands to the broker

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;
use tvlink_shared::{codec, Frame, FrameDecoder, TransportError};

/// Sink for normalized command payloads
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload` on `topic`, returning once the broker has accepted it
    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError>;
}

/// Publishes over the framed TCP broker protocol, one connection per publish
pub struct BrokerPublisher {
    address: String,
    ack_timeout: Duration,
}

impl BrokerPublisher {
    pub fn new(address: impl Into<String>, ack_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            ack_timeout,
        }
    }

    async fn publish_inner(&self, topic: &str, payload: String) -> Result<u32, TransportError> {
        let mut stream = TcpStream::connect(&self.address).await?;

        let frame = Frame::Publish {
            topic: topic.to_string(),
            payload,
        };
        stream.write_all(&codec::encode(&frame)?).await?;

        let mut decoder = FrameDecoder::new();
        let mut buf = vec![0u8; 1024];
        loop {
            if let Some(reply) = decoder.decode_next()? {
                return match reply {
                    Frame::PubAck { delivered, .. } => Ok(delivered),
                    Frame::Error { message } => Err(TransportError::Rejected(message)),
                    other => Err(TransportError::Unexpected(other.kind())),
                };
            }

            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            decoder.extend(&buf[..n]);
        }
    }
}

#[async_trait]
impl Publisher for BrokerPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        let delivered = timeout(self.ack_timeout, self.publish_inner(topic, payload))
            .await
            .map_err(|_| TransportError::Timeout(self.ack_timeout.as_millis() as u64))??;

        debug!(topic, delivered, "Broker accepted publish");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Accept one connection, read a frame, answer with `reply`
    async fn one_shot_broker(reply: Option<Frame>) -> (String, tokio::task::JoinHandle<Frame>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut decoder = FrameDecoder::new();
            let mut buf = vec![0u8; 1024];
            let received = loop {
                if let Some(frame) = decoder.decode_next().unwrap() {
                    break frame;
                }
                let n = socket.read(&mut buf).await.unwrap();
                decoder.extend(&buf[..n]);
            };
            match reply {
                Some(reply) => {
                    socket
                        .write_all(&codec::encode(&reply).unwrap())
                        .await
                        .unwrap();
                }
                // Hold the socket open without answering
                None => tokio::time::sleep(Duration::from_secs(5)).await,
            }
            received
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn test_publish_waits_for_ack() {
        let (addr, broker) = one_shot_broker(Some(Frame::PubAck {
            topic: "tv_topic/tv1".into(),
            delivered: 1,
        }))
        .await;

        let publisher = BrokerPublisher::new(addr, Duration::from_secs(2));
        publisher
            .publish("tv_topic/tv1", "{}".into())
            .await
            .expect("publish should succeed");

        assert_eq!(
            broker.await.unwrap(),
            Frame::Publish {
                topic: "tv_topic/tv1".into(),
                payload: "{}".into()
            }
        );
    }

    #[tokio::test]
    async fn test_publish_surfaces_broker_error() {
        let (addr, _broker) = one_shot_broker(Some(Frame::Error {
            message: "bad topic".into(),
        }))
        .await;

        let publisher = BrokerPublisher::new(addr, Duration::from_secs(2));
        let err = publisher.publish("x", "{}".into()).await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected(m) if m == "bad topic"));
    }

    #[tokio::test]
    async fn test_publish_times_out_without_ack() {
        let (addr, _broker) = one_shot_broker(None).await;

        let publisher = BrokerPublisher::new(addr, Duration::from_millis(100));
        let err = publisher.publish("x", "{}".into()).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(100)));
    }

    #[tokio::test]
    async fn test_publish_fails_when_broker_unreachable() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let publisher = BrokerPublisher::new(addr, Duration::from_secs(1));
        let err = publisher.publish("x", "{}".into()).await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
