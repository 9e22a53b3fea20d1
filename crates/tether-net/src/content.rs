//! Payload container with lazily derived text/byte views.

use std::fmt;
use std::sync::OnceLock;

use bytes::Bytes;

/// A payload that can be read as either text or bytes.
///
/// At least one representation is always present. Asking for the other one
/// derives it once (UTF-8 encode, or lossy UTF-8 decode) and caches it, so
/// repeated reads are cheap and return identical results.
///
/// # Example
///
/// ```
/// use tether_net::ContentBuffer;
///
/// let content = ContentBuffer::from_text("héllo");
/// assert_eq!(content.as_bytes(), "héllo".as_bytes());
/// assert_eq!(content.as_text(), "héllo");
/// ```
#[derive(Clone)]
pub struct ContentBuffer {
    text: OnceLock<String>,
    bytes: OnceLock<Bytes>,
}

impl ContentBuffer {
    /// Build a buffer from text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: OnceLock::from(text.into()),
            bytes: OnceLock::new(),
        }
    }

    /// Build a buffer from raw bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            text: OnceLock::new(),
            bytes: OnceLock::from(bytes.into()),
        }
    }

    /// Build a buffer with both representations supplied by the caller.
    ///
    /// The two are trusted to describe the same payload.
    pub fn from_both(text: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            text: OnceLock::from(text.into()),
            bytes: OnceLock::from(bytes.into()),
        }
    }

    /// The payload as text. Invalid UTF-8 sequences become U+FFFD.
    pub fn as_text(&self) -> &str {
        self.text.get_or_init(|| match self.bytes.get() {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => String::new(),
        })
    }

    /// The payload as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.get_or_init(|| match self.text.get() {
            Some(text) => Bytes::copy_from_slice(text.as_bytes()),
            None => Bytes::new(),
        })
    }

    /// The payload as a cheaply clonable [`Bytes`] handle.
    pub fn to_bytes(&self) -> Bytes {
        self.as_bytes();
        self.bytes.get().cloned().unwrap_or_default()
    }

    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        match (self.bytes.get(), self.text.get()) {
            (Some(bytes), _) => bytes.len(),
            (None, Some(text)) => text.len(),
            (None, None) => 0,
        }
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ContentBuffer {
    fn default() -> Self {
        Self::from_bytes(Bytes::new())
    }
}

impl PartialEq for ContentBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ContentBuffer {}

impl fmt::Debug for ContentBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentBuffer")
            .field("len", &self.len())
            .field("has_text", &self.text.get().is_some())
            .field("has_bytes", &self.bytes.get().is_some())
            .finish()
    }
}

impl From<String> for ContentBuffer {
    fn from(text: String) -> Self {
        Self::from_text(text)
    }
}

impl From<&str> for ContentBuffer {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<Vec<u8>> for ContentBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Bytes> for ContentBuffer {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_bytes_round_trip() {
        let content = ContentBuffer::from_text("ünïcödé ✓");
        assert_eq!(content.as_bytes(), "ünïcödé ✓".as_bytes());
        assert_eq!(content.as_text(), "ünïcödé ✓");
    }

    #[test]
    fn test_bytes_decode_matches_std() {
        let raw = "data: 日本語".as_bytes().to_vec();
        let expected = std::str::from_utf8(&raw).unwrap().to_string();
        let content = ContentBuffer::from_bytes(raw);
        assert_eq!(content.as_text(), expected);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let content = ContentBuffer::from_bytes(vec![b'o', b'k', 0xFF]);
        assert_eq!(content.as_text(), "ok\u{FFFD}");
        // The input bytes are untouched.
        assert_eq!(content.as_bytes(), &[b'o', b'k', 0xFF]);
    }

    #[test]
    fn test_conversion_is_cached() {
        let content = ContentBuffer::from_text("abc");
        let first = content.as_bytes().as_ptr();
        let second = content.as_bytes().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_both_keeps_representations() {
        let content = ContentBuffer::from_both("hi", Bytes::from_static(b"hi"));
        assert_eq!(content.as_text(), "hi");
        assert_eq!(content.len(), 2);
        assert_eq!(content, ContentBuffer::from("hi"));
    }

    #[test]
    fn test_default_is_empty() {
        let content = ContentBuffer::default();
        assert!(content.is_empty());
        assert_eq!(content.as_text(), "");
        assert!(content.to_bytes().is_empty());
    }
}
