//! Connection manager with persistent subscription and automatic reconnection

use crate::transport::TransportConnector;
use anyhow::{anyhow, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use tvlink_shared::{codec, link, now_ms, Frame, FrameDecoder};

/// Events emitted by the connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Connected and subscribed
    Connected { transport: &'static str },
    /// Lost an established connection
    Disconnected { reason: String },
    /// A message published on the subscribed topic
    Received { topic: String, payload: String },
    /// A connection attempt failed; another follows after backoff
    ConnectionFailed { reason: String },
}

/// Configuration for connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Topic to subscribe to
    pub topic: String,
    /// Reconnection delay (initial)
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay
    pub max_reconnect_delay: Duration,
    /// Heartbeat send interval
    pub heartbeat_interval: Duration,
    /// Silence from the broker longer than this drops the connection
    pub read_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            heartbeat_interval: Duration::from_millis(link::HEARTBEAT_INTERVAL_MS),
            read_timeout: Duration::from_millis(link::HEARTBEAT_TIMEOUT_MS),
        }
    }
}

/// Keeps one subscription alive and reports what arrives on it
pub struct ConnectionManager {
    topic: String,
    event_rx: mpsc::Receiver<ConnectionEvent>,
}

impl ConnectionManager {
    /// Create a new connection manager and start the connection loop
    pub fn new<C: TransportConnector>(connector: C, config: ConnectionConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<ConnectionEvent>(100);
        let topic = config.topic.clone();

        tokio::spawn(async move {
            connection_loop(connector, config, event_tx).await;
        });

        Self { topic, event_rx }
    }

    /// Receive the next connection event
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.event_rx.recv().await
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Main connection loop with reconnection logic; ends once events have no reader
async fn connection_loop<C: TransportConnector>(
    connector: C,
    config: ConnectionConfig,
    event_tx: mpsc::Sender<ConnectionEvent>,
) {
    let mut reconnect_delay = config.reconnect_delay;

    loop {
        let event = match connector.connect().await {
            Ok(stream) => {
                reconnect_delay = config.reconnect_delay;

                let reason = match handle_connection(stream, connector.name(), &config, &event_tx).await {
                    Ok(()) => return,
                    Err(e) => e.to_string(),
                };
                ConnectionEvent::Disconnected { reason }
            }
            Err(e) => ConnectionEvent::ConnectionFailed {
                reason: format!("{} ({}): {}", connector.name(), connector.address(), e),
            },
        };

        if event_tx.send(event).await.is_err() {
            return;
        }

        tokio::time::sleep(reconnect_delay).await;

        // Exponential backoff
        reconnect_delay = std::cmp::min(reconnect_delay * 2, config.max_reconnect_delay);
    }
}

/// Subscribe and pump frames until the connection drops
///
/// `Ok(())` means the event receiver went away and the manager should stop.
async fn handle_connection<S>(
    stream: S,
    transport: &'static str,
    config: &ConnectionConfig,
    event_tx: &mpsc::Sender<ConnectionEvent>,
) -> Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let subscribe = Frame::Subscribe {
        topic: config.topic.clone(),
    };
    writer.write_all(&codec::encode(&subscribe)?).await?;

    if event_tx
        .send(ConnectionEvent::Connected { transport })
        .await
        .is_err()
    {
        return Ok(());
    }

    let mut decoder = FrameDecoder::new();
    let mut read_buf = vec![0u8; 4096];

    let mut heartbeat_interval = interval(config.heartbeat_interval);
    heartbeat_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Only inbound bytes count; our own heartbeats do not extend this
    let mut last_rx = Instant::now();

    loop {
        tokio::select! {
            _ = heartbeat_interval.tick() => {
                let heartbeat = Frame::Heartbeat { timestamp_ms: now_ms() };
                writer.write_all(&codec::encode(&heartbeat)?).await?;
            }

            _ = sleep_until(last_rx + config.read_timeout) => {
                return Err(anyhow!(
                    "No traffic from broker for {}ms",
                    config.read_timeout.as_millis()
                ));
            }

            result = reader.read(&mut read_buf) => {
                let n = match result {
                    Ok(0) => return Err(anyhow!("Broker closed connection")),
                    Ok(n) => n,
                    Err(e) => return Err(anyhow!("Read error: {}", e)),
                };
                last_rx = Instant::now();
                decoder.extend(&read_buf[..n]);

                while let Some(frame) = decoder.decode_next()? {
                    match frame {
                        Frame::Message { topic, payload } => {
                            let event = ConnectionEvent::Received { topic, payload };
                            if event_tx.send(event).await.is_err() {
                                return Ok(());
                            }
                        }
                        Frame::Heartbeat { .. } => {}
                        Frame::Error { message } => warn!("Broker error: {}", message),
                        other => debug!("Ignoring {} frame from broker", other.kind()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TcpConnector;
    use bytes::BytesMut;
    use tokio::net::{TcpListener, TcpStream};

    fn fast_config(topic: &str) -> ConnectionConfig {
        ConnectionConfig {
            reconnect_delay: Duration::from_millis(10),
            max_reconnect_delay: Duration::from_millis(40),
            ..ConnectionConfig::new(topic)
        }
    }

    async fn read_frame(stream: &mut TcpStream, buf: &mut BytesMut) -> Frame {
        loop {
            if let Some(frame) = codec::decode(buf).unwrap() {
                return frame;
            }
            let mut chunk = [0u8; 1024];
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed unexpectedly");
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::new("tv_topic/tv1");
        assert_eq!(config.topic, "tv_topic/tv1");
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(30));
        assert_eq!(config.heartbeat_interval, Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_subscribes_and_delivers_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut manager = ConnectionManager::new(TcpConnector::new(addr), fast_config("tv_topic/tv1"));
        assert_eq!(manager.topic(), "tv_topic/tv1");

        let (mut broker, _) = listener.accept().await.unwrap();
        let mut buf = BytesMut::new();
        assert_eq!(
            read_frame(&mut broker, &mut buf).await,
            Frame::Subscribe {
                topic: "tv_topic/tv1".into()
            }
        );
        assert_eq!(
            manager.recv().await,
            Some(ConnectionEvent::Connected { transport: "Broker" })
        );

        let message = Frame::Message {
            topic: "tv_topic/tv1".into(),
            payload: r#"{"source":"Alexa.Speaker","action":true,"task":"muted"}"#.into(),
        };
        broker.write_all(&codec::encode(&message).unwrap()).await.unwrap();

        assert_eq!(
            manager.recv().await,
            Some(ConnectionEvent::Received {
                topic: "tv_topic/tv1".into(),
                payload: r#"{"source":"Alexa.Speaker","action":true,"task":"muted"}"#.into(),
            })
        );
    }

    #[tokio::test]
    async fn test_sends_heartbeats() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let config = ConnectionConfig {
            heartbeat_interval: Duration::from_millis(20),
            ..fast_config("t")
        };
        let _manager = ConnectionManager::new(TcpConnector::new(addr), config);

        let (mut broker, _) = listener.accept().await.unwrap();
        let mut buf = BytesMut::new();
        assert!(matches!(read_frame(&mut broker, &mut buf).await, Frame::Subscribe { .. }));
        assert!(matches!(read_frame(&mut broker, &mut buf).await, Frame::Heartbeat { .. }));
        assert!(matches!(read_frame(&mut broker, &mut buf).await, Frame::Heartbeat { .. }));
    }

    #[tokio::test]
    async fn test_reconnects_and_resubscribes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut manager = ConnectionManager::new(TcpConnector::new(addr), fast_config("t"));

        let (first, _) = listener.accept().await.unwrap();
        assert!(matches!(manager.recv().await, Some(ConnectionEvent::Connected { .. })));
        drop(first);

        assert!(matches!(
            manager.recv().await,
            Some(ConnectionEvent::Disconnected { .. })
        ));

        let (mut second, _) = listener.accept().await.unwrap();
        let mut buf = BytesMut::new();
        assert!(matches!(read_frame(&mut second, &mut buf).await, Frame::Subscribe { .. }));
        assert!(matches!(manager.recv().await, Some(ConnectionEvent::Connected { .. })));
    }

    #[tokio::test]
    async fn test_silent_broker_is_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let config = ConnectionConfig {
            heartbeat_interval: Duration::from_millis(20),
            read_timeout: Duration::from_millis(100),
            ..fast_config("t")
        };
        let mut manager = ConnectionManager::new(TcpConnector::new(addr), config);

        // Accept and read, never write back
        let (mut broker, _) = listener.accept().await.unwrap();
        let mut buf = BytesMut::new();
        assert!(matches!(read_frame(&mut broker, &mut buf).await, Frame::Subscribe { .. }));
        assert!(matches!(manager.recv().await, Some(ConnectionEvent::Connected { .. })));

        let event = tokio::time::timeout(Duration::from_secs(2), manager.recv())
            .await
            .expect("silent broker should be detected");
        assert_eq!(
            event,
            Some(ConnectionEvent::Disconnected {
                reason: "No traffic from broker for 100ms".into()
            })
        );
    }

    #[tokio::test]
    async fn test_broker_heartbeats_keep_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let config = ConnectionConfig {
            heartbeat_interval: Duration::from_millis(20),
            read_timeout: Duration::from_millis(100),
            ..fast_config("t")
        };
        let mut manager = ConnectionManager::new(TcpConnector::new(addr), config);

        let (mut broker, _) = listener.accept().await.unwrap();
        assert!(matches!(manager.recv().await, Some(ConnectionEvent::Connected { .. })));

        let heartbeat = codec::encode(&Frame::Heartbeat { timestamp_ms: 0 }).unwrap();
        for _ in 0..10 {
            broker.write_all(&heartbeat).await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }

        // 300ms elapsed with replies every 30ms; nothing was reported
        let pending = tokio::time::timeout(Duration::from_millis(10), manager.recv()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_broker_reports_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut manager = ConnectionManager::new(TcpConnector::new(addr), fast_config("t"));
        for _ in 0..2 {
            assert!(matches!(
                manager.recv().await,
                Some(ConnectionEvent::ConnectionFailed { .. })
            ));
        }
    }
}
