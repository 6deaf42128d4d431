//! Length-prefixed codec for broker framing
//!
//! All frames are written as:
//! ```text
//! [ 4 bytes: length (u32, big-endian) ][ N bytes: JSON Frame ]
//! ```
//!
//! This keeps frame boundaries intact over TCP streams.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum frame size (1 MB)
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    #[error("Invalid frame length prefix: {0}")]
    InvalidLength(u32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Messages exchanged between broker clients and the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Client asks to receive messages published on `topic`
    Subscribe { topic: String },
    /// Client publishes `payload` on `topic`
    Publish { topic: String, payload: String },
    /// Broker confirms a publish and how many subscribers received it
    PubAck { topic: String, delivered: u32 },
    /// Broker delivers a published payload to a subscriber
    Message { topic: String, payload: String },
    /// Liveness signal from a client
    Heartbeat { timestamp_ms: u64 },
    /// Broker refused the last frame
    Error { message: String },
}

impl Frame {
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Subscribe { .. } => "subscribe",
            Frame::Publish { .. } => "publish",
            Frame::PubAck { .. } => "pub_ack",
            Frame::Message { .. } => "message",
            Frame::Heartbeat { .. } => "heartbeat",
            Frame::Error { .. } => "error",
        }
    }
}

/// Encode a frame into a length-prefixed byte buffer
pub fn encode(frame: &Frame) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    encode_into(frame, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode a frame directly into a provided buffer
pub fn encode_into(frame: &Frame, buf: &mut BytesMut) -> Result<(), CodecError> {
    let body = serde_json::to_vec(frame)?;

    if body.len() > MAX_FRAME_SIZE as usize {
        return Err(CodecError::FrameTooLarge(body.len()));
    }

    buf.reserve(4 + body.len());
    buf.put_u32(body.len() as u32);
    buf.put_slice(&body);

    Ok(())
}

/// Try to decode a length-prefixed frame from a buffer
///
/// Returns:
/// - `Ok(Some(frame))` if a complete frame was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid
pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    // Peek at the length prefix without consuming
    let frame_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);

    if frame_len > MAX_FRAME_SIZE {
        return Err(CodecError::InvalidLength(frame_len));
    }

    let total_len = 4 + frame_len as usize;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(4);
    let body = buf.split_to(frame_len as usize);
    let frame = serde_json::from_slice(&body)?;

    Ok(Some(frame))
}

/// Decoder state for streaming reads
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete frames
    pub fn decode_next(&mut self) -> Result<Option<Frame>, CodecError> {
        decode(&mut self.buffer)
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish_frame() -> Frame {
        Frame::Publish {
            topic: "tv_topic/tv1".into(),
            payload: r#"{"source":"Alexa.PowerController","action":"ON","task":"power"}"#.into(),
        }
    }

    #[test]
    fn test_frame_json_is_tagged() {
        let json = serde_json::to_value(Frame::Subscribe {
            topic: "tv_topic/tv1".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "subscribe", "topic": "tv_topic/tv1"})
        );
    }

    #[test]
    fn test_length_prefix_matches_body() {
        let encoded = encode(&publish_frame()).expect("encode failed");
        let len_prefix = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        assert_eq!(len_prefix as usize, encoded.len() - 4);
    }

    #[test]
    fn test_partial_decode() {
        let encoded = encode(&publish_frame()).expect("encode failed");

        let mut buf = BytesMut::from(&encoded[..5]);
        let result = decode(&mut buf).expect("decode should not fail on partial data");
        assert!(result.is_none());

        // Nothing consumed
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_frame_decoder_chunks_and_multiple_frames() {
        let first = encode(&publish_frame()).expect("encode failed");
        let second = encode(&Frame::Heartbeat { timestamp_ms: 42 }).expect("encode failed");

        let mut decoder = FrameDecoder::new();
        decoder.extend(&first[..7]);
        assert!(decoder.decode_next().expect("decode error").is_none());

        decoder.extend(&first[7..]);
        decoder.extend(&second);

        assert_eq!(decoder.decode_next().unwrap(), Some(publish_frame()));
        assert_eq!(
            decoder.decode_next().unwrap(),
            Some(Frame::Heartbeat { timestamp_ms: 42 })
        );
        assert!(decoder.decode_next().unwrap().is_none());
        assert_eq!(decoder.buffer_len(), 0);
    }

    #[test]
    fn test_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u32(MAX_FRAME_SIZE + 1);
        buf.put_bytes(0, 100);

        let result = decode(&mut buf);
        assert!(matches!(result, Err(CodecError::InvalidLength(_))));
    }

    #[test]
    fn test_garbage_body_is_json_error() {
        let mut buf = BytesMut::new();
        buf.put_u32(3);
        buf.put_slice(b"{{{");

        assert!(matches!(decode(&mut buf), Err(CodecError::Json(_))));
    }
}
