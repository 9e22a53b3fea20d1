//! Incremental server-sent events framing.
//!
//! An SSE stream is a sequence of records separated by a blank line:
//!
//! ```text
//! event: ping
//! id: 1
//! data: hello
//!
//! ```
//!
//! [`SseFrameParser`] works on the cumulative response body. It remembers how
//! far it has consumed, so the same buffer can be handed back after every
//! network delivery without rescanning earlier records.

use bytes::Bytes;
use tether_core::logging::targets;

use crate::content::ContentBuffer;

const TERMINATOR: &[u8] = b"\n\n";

/// One parsed server-sent event.
///
/// `event` and `id` are empty when the record omitted them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSentEvent {
    /// The `event:` field.
    pub event: ContentBuffer,
    /// The `id:` field.
    pub id: ContentBuffer,
    /// The `data:` field. Multiple data lines are joined with `\n`.
    pub data: ContentBuffer,
}

/// Stateful SSE record extractor.
///
/// # Example
///
/// ```
/// use tether_net::SseFrameParser;
///
/// let mut parser = SseFrameParser::new();
/// let mut body = b"data: par".to_vec();
/// assert!(parser.try_extract_event(&body).is_none());
///
/// body.extend_from_slice(b"tial\n\n");
/// let event = parser.try_extract_event(&body).unwrap();
/// assert_eq!(event.data.as_text(), "partial");
/// assert_eq!(parser.read_offset(), body.len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SseFrameParser {
    read_offset: usize,
}

impl SseFrameParser {
    /// Create a parser positioned at the start of the stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first byte not yet consumed.
    pub fn read_offset(&self) -> usize {
        self.read_offset
    }

    /// Rewind to the start, for use after the caller discards its buffer.
    pub fn reset(&mut self) {
        self.read_offset = 0;
    }

    /// Try to pull the next complete record out of `buffer`.
    ///
    /// Returns `None` without moving when no terminator follows the read
    /// offset yet. A complete record without a `data` field is dropped: the
    /// offset still moves past it, but `None` is returned. Use
    /// [`extract_all`](Self::extract_all) to keep going past such records.
    pub fn try_extract_event(&mut self, buffer: &[u8]) -> Option<ServerSentEvent> {
        let start = self.read_offset;
        if start >= buffer.len() {
            return None;
        }

        let end = start + find(&buffer[start..], TERMINATOR)?;
        self.read_offset = end + TERMINATOR.len();

        let event = parse_record(&buffer[start..end]);
        if event.is_none() {
            tracing::trace!(
                target: targets::SSE,
                offset = start,
                "discarding record without a data field"
            );
        }
        event
    }

    /// Extract every complete record currently buffered.
    pub fn extract_all(&mut self, buffer: &[u8]) -> Vec<ServerSentEvent> {
        let mut events = Vec::new();
        loop {
            let before = self.read_offset;
            match self.try_extract_event(buffer) {
                Some(event) => events.push(event),
                None if self.read_offset == before => break,
                None => {}
            }
        }
        events
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_record(record: &[u8]) -> Option<ServerSentEvent> {
    let mut event = None;
    let mut id = None;
    let mut data: Option<Vec<u8>> = None;

    for line in record.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        // Comment lines start with a colon.
        if line.first() == Some(&b':') {
            continue;
        }

        if let Some(value) = field_value(line, b"data") {
            match data.as_mut() {
                Some(joined) => {
                    joined.push(b'\n');
                    joined.extend_from_slice(value);
                }
                None => data = Some(value.to_vec()),
            }
        } else if let Some(value) = field_value(line, b"event") {
            event = Some(value);
        } else if let Some(value) = field_value(line, b"id") {
            id = Some(value);
        }
    }

    let buffer = |value: Option<&[u8]>| {
        ContentBuffer::from_bytes(value.map(Bytes::copy_from_slice).unwrap_or_default())
    };

    Some(ServerSentEvent {
        data: ContentBuffer::from_bytes(data?),
        event: buffer(event),
        id: buffer(id),
    })
}

/// `name: value` or `name:value`.
fn field_value<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let rest = line.strip_prefix(name)?.strip_prefix(b":")?;
    Some(rest.strip_prefix(b" ").unwrap_or(rest))
}
