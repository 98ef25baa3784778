//! Wire encoding and decoding of protocol events.
//!
//! Two framings are supported, chosen by the caller's `Accept` header:
//!
//! | Format | Frame |
//! |--------|-------|
//! | [`WireFormat::Sse`] | `data: <json>\n\n` |
//! | [`WireFormat::Json`] | `<json>\n` |
//!
//! Encoding is stateless per event. Decoding buffers raw bytes until a
//! complete frame has arrived, so frames may be split across reads at any
//! byte offset, including inside a multi-byte UTF-8 sequence.

use std::fmt;

use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use thiserror::Error;

use crate::events::Event;

pub const SSE_CONTENT_TYPE: &str = "text/event-stream";
pub const JSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Framing used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// Server-Sent Events.
    Sse,
    /// Newline-delimited JSON.
    #[default]
    Json,
}

impl WireFormat {
    /// Pick a format from an `Accept` header value.
    ///
    /// `text/event-stream` (with a non-zero quality) selects SSE; anything
    /// else, including a missing header, selects newline-delimited JSON.
    pub fn from_accept(accept: Option<&str>) -> Self {
        let Some(accept) = accept else {
            return WireFormat::Json;
        };

        let accepts_sse = accept.split(',').any(|range| {
            let mut params = range.split(';');
            let media_type = params.next().unwrap_or("").trim();
            if !media_type.eq_ignore_ascii_case(SSE_CONTENT_TYPE) {
                return false;
            }
            !params.any(|p| {
                p.trim()
                    .strip_prefix("q=")
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            })
        });

        if accepts_sse {
            WireFormat::Sse
        } else {
            WireFormat::Json
        }
    }

    /// The response `Content-Type` for this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            WireFormat::Sse => SSE_CONTENT_TYPE,
            WireFormat::Json => JSON_CONTENT_TYPE,
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content_type())
    }
}

/// Error encoding an event.
#[derive(Debug, Error)]
#[error("failed to encode event: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Error decoding a byte stream into events.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A complete frame was not valid UTF-8
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A frame did not contain a known event
    #[error("malformed event: {source} (data: {data})")]
    Json {
        source: serde_json::Error,
        data: String,
    },

    /// The underlying byte stream failed
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame grew past the decoder's size limit without completing
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
}

/// Serializes events into wire frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventEncoder {
    format: WireFormat,
}

impl EventEncoder {
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    /// Build an encoder for the given `Accept` header.
    pub fn from_accept(accept: Option<&str>) -> Self {
        Self::new(WireFormat::from_accept(accept))
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Encode one event into one frame.
    pub fn encode(&self, event: &Event) -> Result<String, EncodeError> {
        // serde_json escapes newlines inside strings, so the JSON is always a
        // single line and never contains a frame delimiter.
        let json = serde_json::to_string(event)?;
        Ok(match self.format {
            WireFormat::Sse => format!("data: {}\n\n", json),
            WireFormat::Json => format!("{}\n", json),
        })
    }
}

/// Default upper bound on the size of a single frame.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Longest frame delimiter (`\r\n\r\n`).
const MAX_DELIMITER_LEN: usize = 4;

/// Incremental decoder for a framed event byte stream.
///
/// Each pushed byte is scanned for a delimiter once. A frame that grows past
/// [`max_frame_len`](Self::with_max_frame_len) fails with
/// [`DecodeError::FrameTooLarge`] and the buffered bytes are dropped.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    format: WireFormat,
    buffer: Vec<u8>,
    /// Offset up to which `buffer` is known to hold no delimiter.
    scanned: usize,
    max_frame_len: usize,
}

impl EventDecoder {
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            buffer: Vec::new(),
            scanned: 0,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Set the largest accepted frame, delimiter excluded.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk of bytes and return every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Event>, DecodeError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        let result = loop {
            let from = self.scanned.max(consumed);
            let Some((offset, delimiter_len)) = find_delimiter(self.format, &self.buffer[from..])
            else {
                // A delimiter may straddle the end of this chunk.
                self.scanned = self
                    .buffer
                    .len()
                    .saturating_sub(MAX_DELIMITER_LEN - 1)
                    .max(consumed);
                break Ok(());
            };

            let end = from + offset;
            if end - consumed > self.max_frame_len {
                break Err(DecodeError::FrameTooLarge {
                    limit: self.max_frame_len,
                });
            }
            let decoded = self.decode_frame(&self.buffer[consumed..end]);
            consumed = end + delimiter_len;
            match decoded {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => break Err(e),
            }
        };

        if let Err(e) = result {
            self.reset();
            return Err(e);
        }

        self.buffer.drain(..consumed);
        self.scanned -= consumed;

        if self.buffer.len() > self.max_frame_len {
            self.reset();
            return Err(DecodeError::FrameTooLarge {
                limit: self.max_frame_len,
            });
        }

        Ok(events)
    }

    /// Flush a final frame that was not followed by a delimiter.
    ///
    /// Fails if the leftover bytes are not a complete event.
    pub fn finish(&mut self) -> Result<Option<Event>, DecodeError> {
        let frame = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        self.decode_frame(&frame)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    fn decode_frame(&self, frame: &[u8]) -> Result<Option<Event>, DecodeError> {
        let text = std::str::from_utf8(frame)?;
        let data = match self.format {
            WireFormat::Json => {
                let line = text.trim();
                if line.is_empty() {
                    return Ok(None);
                }
                line.to_string()
            }
            WireFormat::Sse => match sse_data(text) {
                Some(data) => data,
                None => return Ok(None),
            },
        };

        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| DecodeError::Json { source, data })
    }
}

/// Join the `data` lines of one SSE frame.
///
/// Comment lines (keep-alives) and other fields are skipped. Returns `None`
/// when the frame carries no data.
fn sse_data(frame: &str) -> Option<String> {
    let mut data: Option<String> = None;

    for line in frame.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field != "data" {
            continue;
        }
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    data
}

/// Position and length of the first frame delimiter in `buf`.
fn find_delimiter(format: WireFormat, buf: &[u8]) -> Option<(usize, usize)> {
    match format {
        WireFormat::Json => buf.iter().position(|b| *b == b'\n').map(|i| (i, 1)),
        WireFormat::Sse => {
            let lf = find(buf, b"\n\n").map(|i| (i, 2));
            let crlf = find(buf, b"\r\n\r\n").map(|i| (i, 4));
            match (lf, crlf) {
                (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
                (a, b) => a.or(b),
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decode a stream of byte chunks into events.
///
/// The stream fails on the first transport or decode error.
pub fn decode_stream<S, B, E>(
    format: WireFormat,
    bytes: S,
) -> BoxStream<'static, Result<Event, DecodeError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
{
    Box::pin(async_stream::stream! {
        let mut decoder = EventDecoder::new(format);
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let events = match chunk {
                Ok(chunk) => decoder.push(chunk.as_ref()),
                Err(e) => Err(DecodeError::Transport(e.to_string())),
            };
            match events {
                Ok(events) => {
                    for event in events {
                        yield Ok::<Event, DecodeError>(event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        match decoder.finish() {
            Ok(Some(event)) => {
                yield Ok(event);
            }
            Ok(None) => {}
            Err(e) => {
                yield Err(e);
            }
        }
    })
}

#[cfg(test)]
#[path = "encoding_tests.rs"]
mod tests;
