//! Serial handshake
//! after the port is opened the board prints a readiness token (ESP32_OK);
//! read text chunks until the token shows up, the stream ends, or time runs out.
//! the reader lease is dropped on every one of these paths

use std::time::Duration;
use futures::StreamExt;
use tokio_util::{
    bytes::BytesMut,
    codec::{Decoder, FramedRead},
};

use super::serial_link::SerialLink;
use crate::common::error::{ClientError, ErrorCode};
use crate::{debug, trace};

const LOG_TAG: &str = "handshake.rs | serial handshake";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Acknowledged,
    StreamEnded,
    TimedOut,
    ReadError(String),
}

impl HandshakeOutcome {
    /// error describing a failed handshake, None when acknowledged
    pub fn into_error(self, token: &str, limit: Duration) -> Option<ClientError> {
        match self {
            HandshakeOutcome::Acknowledged => None,
            HandshakeOutcome::TimedOut => Some(ClientError::new(
                ErrorCode::HandshakeTimeout,
                format!("no {} from device within {}s", token, limit.as_secs()),
            )),
            HandshakeOutcome::StreamEnded => Some(ClientError::new(
                ErrorCode::TransportFailure,
                format!("serial stream ended before {}", token),
            )),
            HandshakeOutcome::ReadError(msg) => Some(ClientError::new(
                ErrorCode::TransportFailure,
                format!("serial read failed: {}", msg),
            )),
        }
    }
}

/// wait for `token` on the link for at most `limit`
pub async fn run_handshake(link: &mut SerialLink, token: &str, limit: Duration) -> HandshakeOutcome {
    let mut frames = FramedRead::new(link.lock_reader(), TextChunkCodec);
    let mut seen = String::new();

    let read_loop = async {
        while let Some(chunk) = frames.next().await {
            match chunk {
                Ok(text) => {
                    trace!(LOG_TAG, "got chunk: {:?}", text);
                    seen.push_str(&text);
                    if seen.contains(token) {
                        return HandshakeOutcome::Acknowledged;
                    }
                    keep_tail(&mut seen, token.len());
                }
                Err(e) => return HandshakeOutcome::ReadError(e.to_string()),
            }
        }
        HandshakeOutcome::StreamEnded
    };

    let outcome = match tokio::time::timeout(limit, read_loop).await {
        Ok(outcome) => outcome,
        Err(_) => HandshakeOutcome::TimedOut,
    };
    drop(frames);
    debug!(LOG_TAG, "handshake finished: {:?}", outcome);
    outcome
}

/// only a token-sized tail can still complete a match
fn keep_tail(seen: &mut String, token_len: usize) {
    let mut cut = seen.len().saturating_sub(token_len);
    while !seen.is_char_boundary(cut) {
        cut -= 1;
    }
    seen.drain(..cut);
}

/// yields whatever text is buffered; a multi-byte char split over two reads waits for its tail
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct TextChunkCodec;

impl Decoder for TextChunkCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let ready = match std::str::from_utf8(buf) {
            Ok(_) => buf.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            // garbage bytes, take everything and let lossy decoding mark it
            Err(_) => buf.len(),
        };
        if ready == 0 {
            return Ok(None);
        }
        let chunk = buf.split_to(ready);
        Ok(Some(String::from_utf8_lossy(&chunk).into_owned()))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }
        let chunk = buf.split();
        Ok(Some(String::from_utf8_lossy(&chunk).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use tokio::io::AsyncWriteExt;
    use crate::common::logger::init_logger;

    const TOKEN: &str = "ESP32_OK";

    fn link_pair() -> (tokio::io::DuplexStream, SerialLink) {
        let _ = init_logger();
        let (device, host) = tokio::io::duplex(256);
        (device, SerialLink::new("/dev/ttyTEST0", Box::new(host)))
    }

    #[tokio::test]
    async fn test_token_found() {
        let (mut device, mut link) = link_pair();
        let counter = link.release_counter();
        device.write_all(b"rst:0x1 boot\r\nESP32_OK\r\n").await.unwrap();

        let outcome = run_handshake(&mut link, TOKEN, Duration::from_secs(10)).await;
        assert_eq!(outcome, HandshakeOutcome::Acknowledged);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_split_across_chunks() {
        let (mut device, mut link) = link_pair();
        let writer = tokio::spawn(async move {
            device.write_all(b"ESP3").await.unwrap();
            tokio::task::yield_now().await;
            device.write_all(b"2_OK").await.unwrap();
            device
        });

        let outcome = run_handshake(&mut link, TOKEN, Duration::from_secs(10)).await;
        assert_eq!(outcome, HandshakeOutcome::Acknowledged);
        let _device = writer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_lock_once() {
        let (mut device, mut link) = link_pair();
        let counter = link.release_counter();
        device.write_all(b"booting...").await.unwrap();

        let started = tokio::time::Instant::now();
        let outcome = run_handshake(&mut link, TOKEN, Duration::from_secs(10)).await;
        assert_eq!(outcome, HandshakeOutcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let err = outcome.into_error(TOKEN, Duration::from_secs(10)).unwrap();
        assert_eq!(err.code, ErrorCode::HandshakeTimeout);
        drop(device);
    }

    #[tokio::test]
    async fn test_stream_end_without_token() {
        let (mut device, mut link) = link_pair();
        let counter = link.release_counter();
        device.write_all(b"ESP32_ER").await.unwrap();
        drop(device);

        let outcome = run_handshake(&mut link, TOKEN, Duration::from_secs(10)).await;
        assert_eq!(outcome, HandshakeOutcome::StreamEnded);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_codec_waits_for_split_char() {
        let mut buf = BytesMut::from(&b"ok \xc3"[..]);
        let first = TextChunkCodec.decode(&mut buf).unwrap();
        assert_eq!(first.as_deref(), Some("ok "));
        assert_eq!(TextChunkCodec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\xa9");
        assert_eq!(TextChunkCodec.decode(&mut buf).unwrap().as_deref(), Some("é"));
    }

    #[test]
    fn test_keep_tail() {
        let mut seen = String::from("garbage ESP32_O");
        keep_tail(&mut seen, TOKEN.len());
        assert_eq!(seen, " ESP32_O");
    }
}
