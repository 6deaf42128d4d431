//! Per-client frame handling and the accept loop

use crate::session::{ClientSession, SessionHandle, SessionManager};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tvlink_shared::{link, now_ms, Frame};

/// Accept clients forever, one task per connection
pub async fn serve(listener: TcpListener, manager: Arc<SessionManager>) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let session = ClientSession::new(manager.next_session_id(), stream, addr);
        debug!("Connection from {} (session {})", addr, session.id());

        let manager = manager.clone();
        tokio::spawn(async move {
            handle_client(session, manager).await;
        });
    }
}

/// Drop sessions that stop heartbeating
pub async fn sweep_dead_sessions(manager: Arc<SessionManager>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(link::HEARTBEAT_INTERVAL_MS));
    loop {
        ticker.tick().await;
        for id in manager.remove_dead_sessions().await {
            warn!("Session {} timed out", id);
        }
    }
}

pub async fn handle_client(mut session: ClientSession, manager: Arc<SessionManager>) {
    let handle = session.get_handle();
    manager.register(handle.clone()).await;

    while let Some(frame) = session.recv().await {
        if let Err(e) = handle_frame(frame, &handle, &manager).await {
            warn!("Session {} ({}) write failed: {}", handle.id, handle.addr, e);
            break;
        }
    }

    manager.unregister(handle.id).await;
    debug!(
        "Session {} ({}) closed after {:?}, silent for {:?}",
        handle.id,
        handle.addr,
        handle.connected_at.elapsed(),
        handle.time_since_seen().await
    );
}

async fn handle_frame(frame: Frame, handle: &SessionHandle, manager: &SessionManager) -> Result<()> {
    match frame {
        Frame::Subscribe { topic } => {
            if topic.is_empty() {
                return handle.send(&error("empty topic")).await;
            }
            manager.subscribe(handle.id, &topic).await;
            info!("Session {} ({}) subscribed to {}", handle.id, handle.addr, topic);
        }
        Frame::Publish { topic, payload } => {
            if topic.is_empty() {
                return handle.send(&error("empty topic")).await;
            }
            let delivered = manager.publish(&topic, &payload).await;
            info!("Published on {} to {} subscriber(s)", topic, delivered);
            handle.send(&Frame::PubAck { topic, delivered }).await?;
        }
        Frame::Heartbeat { .. } => {
            handle
                .send(&Frame::Heartbeat {
                    timestamp_ms: now_ms(),
                })
                .await?;
        }
        other => {
            let message = format!("unexpected {} frame", other.kind());
            handle.send(&error(&message)).await?;
        }
    }
    Ok(())
}

fn error(message: &str) -> Frame {
    Frame::Error {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tvlink_shared::codec;

    struct Client {
        stream: TcpStream,
        buf: BytesMut,
    }

    impl Client {
        async fn connect(addr: std::net::SocketAddr) -> Self {
            Self {
                stream: TcpStream::connect(addr).await.unwrap(),
                buf: BytesMut::new(),
            }
        }

        async fn send(&mut self, frame: Frame) {
            self.stream
                .write_all(&codec::encode(&frame).unwrap())
                .await
                .unwrap();
        }

        async fn recv(&mut self) -> Frame {
            loop {
                if let Some(frame) = codec::decode(&mut self.buf).unwrap() {
                    return frame;
                }
                let mut chunk = [0u8; 1024];
                let n = self.stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "broker closed connection");
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }

    async fn start() -> (std::net::SocketAddr, Arc<SessionManager>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let manager = Arc::new(SessionManager::new());
        tokio::spawn(serve(listener, manager.clone()));
        (addr, manager)
    }

    async fn wait_for_subscriber(manager: &SessionManager, topic: &str) {
        while manager.subscribers(topic).await == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_publish_fans_out_and_acks() {
        let (addr, manager) = start().await;

        let mut subscriber = Client::connect(addr).await;
        subscriber
            .send(Frame::Subscribe {
                topic: "tv_topic/tv1".into(),
            })
            .await;
        wait_for_subscriber(&manager, "tv_topic/tv1").await;

        let mut publisher = Client::connect(addr).await;
        publisher
            .send(Frame::Publish {
                topic: "tv_topic/tv1".into(),
                payload: r#"{"source":"Alexa.PowerController","action":"ON","task":"power"}"#.into(),
            })
            .await;

        assert_eq!(
            publisher.recv().await,
            Frame::PubAck {
                topic: "tv_topic/tv1".into(),
                delivered: 1
            }
        );
        assert_eq!(
            subscriber.recv().await,
            Frame::Message {
                topic: "tv_topic/tv1".into(),
                payload: r#"{"source":"Alexa.PowerController","action":"ON","task":"power"}"#.into(),
            }
        );
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_acks_zero() {
        let (addr, _manager) = start().await;
        let mut publisher = Client::connect(addr).await;
        publisher
            .send(Frame::Publish {
                topic: "tv_topic/nobody".into(),
                payload: "{}".into(),
            })
            .await;
        assert_eq!(
            publisher.recv().await,
            Frame::PubAck {
                topic: "tv_topic/nobody".into(),
                delivered: 0
            }
        );
    }

    #[tokio::test]
    async fn test_heartbeat_is_echoed() {
        let (addr, _manager) = start().await;
        let mut client = Client::connect(addr).await;
        client.send(Frame::Heartbeat { timestamp_ms: 1 }).await;
        assert!(matches!(client.recv().await, Frame::Heartbeat { .. }));
    }

    #[tokio::test]
    async fn test_bad_frames_get_errors() {
        let (addr, _manager) = start().await;
        let mut client = Client::connect(addr).await;

        client.send(Frame::Subscribe { topic: String::new() }).await;
        assert_eq!(
            client.recv().await,
            Frame::Error {
                message: "empty topic".into()
            }
        );

        client
            .send(Frame::PubAck {
                topic: "t".into(),
                delivered: 0,
            })
            .await;
        assert_eq!(
            client.recv().await,
            Frame::Error {
                message: "unexpected pub_ack frame".into()
            }
        );
    }

    #[tokio::test]
    async fn test_disconnect_unregisters() {
        let (addr, manager) = start().await;
        let mut client = Client::connect(addr).await;
        client.send(Frame::Subscribe { topic: "t".into() }).await;
        wait_for_subscriber(&manager, "t").await;

        drop(client);
        while manager.count().await > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(manager.subscribers("t").await, 0);
    }
}
