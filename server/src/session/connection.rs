//! Individual client session handling

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::warn;
use tvlink_shared::{codec, Frame, FrameDecoder};

/// Handle to send frames to a specific client
#[derive(Clone)]
pub struct SessionHandle {
    pub id: u64,
    pub addr: SocketAddr,
    writer: Arc<Mutex<WriteHalf<TcpStream>>>,
    pub connected_at: Instant,
    pub last_seen: Arc<Mutex<Instant>>,
}

impl SessionHandle {
    /// Send a frame to this client
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        let encoded = codec::encode(frame)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&encoded).await?;
        Ok(())
    }

    pub async fn touch(&self) {
        *self.last_seen.lock().await = Instant::now();
    }

    pub async fn time_since_seen(&self) -> Duration {
        self.last_seen.lock().await.elapsed()
    }

    /// Close the write side; the client sees end of stream
    pub async fn shutdown(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

/// Active client session
pub struct ClientSession {
    pub handle: SessionHandle,
    reader: ReadHalf<TcpStream>,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl ClientSession {
    /// Create a new client session from a TCP stream
    pub fn new(id: u64, stream: TcpStream, addr: SocketAddr) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        let now = Instant::now();

        let handle = SessionHandle {
            id,
            addr,
            writer: Arc::new(Mutex::new(writer)),
            connected_at: now,
            last_seen: Arc::new(Mutex::new(now)),
        };

        Self {
            handle,
            reader,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    /// Get a cloneable handle for sending frames
    pub fn get_handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Read the next frame from this session
    /// Returns None if the connection is closed or the stream is corrupt
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            match self.decoder.decode_next() {
                Ok(Some(frame)) => {
                    // Any traffic counts as liveness
                    self.handle.touch().await;
                    return Some(frame);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Decode error from {}: {}", self.handle.addr, e);
                    return None;
                }
            }

            match self.reader.read(&mut self.read_buf).await {
                Ok(0) => return None,
                Ok(n) => self.decoder.extend(&self.read_buf[..n]),
                Err(e) => {
                    warn!("Read error from {}: {}", self.handle.addr, e);
                    return None;
                }
            }
        }
    }

    pub fn id(&self) -> u64 {
        self.handle.id
    }
}
