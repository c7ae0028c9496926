//! Batch decoder
//!
//! Turns the raw bytes of one open partition stream into a lazy,
//! forward-only sequence of [`Batch`]es. The broker frames its output as
//! newline-delimited JSON objects; each line carries the batch's end cursor
//! and, unless it is a keep-alive, the events consumed up to that cursor:
//!
//! ```text
//! {"cursor":{"partition":"0","offset":"42"},"events":[{...},{...}]}
//! {"cursor":{"partition":"0","offset":"42"}}
//! ```
//!
//! Keep-alive frames (no `events` field, or an empty one) are skipped
//! without surfacing a batch. Any line that fails to decode poisons the
//! whole stream: a partially corrupt byte stream has no trustworthy resume
//! position, so the error is unrecoverable.

use crate::client::ByteStream;
use crate::error::{EventlineError, Result};
use crate::model::{Batch, Cursor, EventType, EventTypeCursor, PartitionId};
use bytes::BytesMut;
use futures::StreamExt;
use serde::Deserialize;
use tracing::trace;

/// One line of the wire stream.
#[derive(Debug, Deserialize)]
struct StreamFrame {
    cursor: FrameCursor,
    #[serde(default)]
    events: Option<Vec<serde_json::Value>>,
}

/// Cursor object inside a stream frame.
#[derive(Debug, Deserialize)]
struct FrameCursor {
    partition: String,
    offset: String,
}

/// Decoder over one live byte stream.
///
/// Non-restartable: once a decode error or end-of-stream is hit, the
/// decoder is exhausted and the caller opens a fresh connection (and with
/// it a fresh decoder) from its last committed cursor.
pub struct BatchDecoder {
    stream: ByteStream,
    event_type: EventType,
    // Accumulates raw bytes between newline boundaries. A frame may span
    // several chunks, and one chunk may carry several frames.
    buffer: BytesMut,
    frames: u64,
    exhausted: bool,
}

impl BatchDecoder {
    pub fn new(event_type: EventType, stream: ByteStream) -> Self {
        Self {
            stream,
            event_type,
            buffer: BytesMut::new(),
            frames: 0,
            exhausted: false,
        }
    }

    /// Frames decoded on this connection so far, keep-alives included.
    ///
    /// Distinguishes a broker cycling a healthy connection from one that
    /// closes without ever speaking the protocol.
    pub fn frames_decoded(&self) -> u64 {
        self.frames
    }

    /// Next non-keep-alive batch, or `None` when the broker closed the
    /// stream.
    ///
    /// Transport errors from the underlying stream pass through as
    /// recoverable; malformed frames return
    /// [`EventlineError::Decode`] and exhaust the decoder.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>> {
        if self.exhausted {
            return Ok(None);
        }
        loop {
            // Drain complete lines already buffered before reading more.
            while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line = self.buffer.split_to(pos + 1);
                let mut line = &line[..line.len() - 1];
                if line.ends_with(b"\r") {
                    line = &line[..line.len() - 1];
                }
                if line.is_empty() {
                    continue;
                }
                match self.decode_line(line) {
                    Ok(Some(batch)) => {
                        self.frames += 1;
                        return Ok(Some(batch));
                    }
                    Ok(None) => {
                        // keep-alive
                        self.frames += 1;
                        continue;
                    }
                    Err(e) => {
                        self.exhausted = true;
                        return Err(e);
                    }
                }
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.exhausted = true;
                    return Err(e);
                }
                None => {
                    self.exhausted = true;
                    if self.buffer.iter().any(|&b| b != b'\n' && b != b'\r') {
                        // A trailing partial frame means the connection was
                        // cut mid-line; the committed cursor still covers
                        // everything delivered, so this is reconnectable.
                        return Err(EventlineError::Transport(
                            "stream closed mid-frame".to_string(),
                        ));
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn decode_line(&self, line: &[u8]) -> Result<Option<Batch>> {
        let frame: StreamFrame = serde_json::from_slice(line).map_err(|e| {
            EventlineError::Decode(format!(
                "malformed stream frame for {}: {e}",
                self.event_type
            ))
        })?;
        let cursor = EventTypeCursor::new(
            self.event_type.clone(),
            PartitionId::new(frame.cursor.partition),
            Cursor::new(frame.cursor.offset),
        );
        match frame.events {
            Some(events) if !events.is_empty() => Ok(Some(Batch { events, cursor })),
            _ => {
                trace!(cursor = %cursor, "Skipping keep-alive frame");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn decoder_from_chunks(chunks: Vec<Result<Bytes>>) -> BatchDecoder {
        BatchDecoder::new(
            EventType::new("order.created"),
            Box::pin(futures::stream::iter(chunks)),
        )
    }

    #[tokio::test]
    async fn test_decodes_batches_in_order() {
        let body = concat!(
            "{\"cursor\":{\"partition\":\"0\",\"offset\":\"1\"},\"events\":[{\"n\":1}]}\n",
            "{\"cursor\":{\"partition\":\"0\",\"offset\":\"2\"},\"events\":[{\"n\":2},{\"n\":3}]}\n",
        );
        let mut decoder = decoder_from_chunks(vec![Ok(Bytes::from_static(body.as_bytes()))]);

        let first = decoder.next_batch().await.unwrap().unwrap();
        assert_eq!(first.cursor.cursor.as_str(), "1");
        assert_eq!(first.events.len(), 1);

        let second = decoder.next_batch().await.unwrap().unwrap();
        assert_eq!(second.cursor.cursor.as_str(), "2");
        assert_eq!(second.events.len(), 2);

        assert!(decoder.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_split_across_chunks() {
        let mut decoder = decoder_from_chunks(vec![
            Ok(Bytes::from_static(
                b"{\"cursor\":{\"partition\":\"0\",\"off",
            )),
            Ok(Bytes::from_static(
                b"set\":\"9\"},\"events\":[{\"id\":\"a\"}]}\n",
            )),
        ]);
        let batch = decoder.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.cursor.cursor.as_str(), "9");
    }

    #[tokio::test]
    async fn test_keep_alive_frames_are_skipped() {
        let body = concat!(
            "{\"cursor\":{\"partition\":\"0\",\"offset\":\"5\"}}\n",
            "{\"cursor\":{\"partition\":\"0\",\"offset\":\"5\"},\"events\":[]}\n",
            "{\"cursor\":{\"partition\":\"0\",\"offset\":\"6\"},\"events\":[{\"n\":1}]}\n",
        );
        let mut decoder = decoder_from_chunks(vec![Ok(Bytes::from_static(body.as_bytes()))]);
        let batch = decoder.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.cursor.cursor.as_str(), "6");
        assert_eq!(decoder.frames_decoded(), 3, "keep-alives count as frames");
    }

    #[tokio::test]
    async fn test_malformed_frame_is_a_decode_error() {
        let mut decoder =
            decoder_from_chunks(vec![Ok(Bytes::from_static(b"this is not json\n"))]);
        let err = decoder.next_batch().await.unwrap_err();
        assert!(matches!(err, EventlineError::Decode(_)));
        // Decoder is exhausted afterwards
        assert!(decoder.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let mut decoder = decoder_from_chunks(vec![
            Ok(Bytes::from_static(
                b"{\"cursor\":{\"partition\":\"0\",\"offset\":\"1\"},\"events\":[{}]}\n",
            )),
            Err(EventlineError::Transport("connection reset".to_string())),
        ]);
        assert!(decoder.next_batch().await.unwrap().is_some());
        let err = decoder.next_batch().await.unwrap_err();
        assert!(matches!(err, EventlineError::Transport(_)));
    }

    #[tokio::test]
    async fn test_stream_cut_mid_frame_is_transport_error() {
        let mut decoder = decoder_from_chunks(vec![Ok(Bytes::from_static(
            b"{\"cursor\":{\"partition\":\"0\",\"offset\":\"1\"}",
        ))]);
        let err = decoder.next_batch().await.unwrap_err();
        assert!(matches!(err, EventlineError::Transport(_)));
    }
}
