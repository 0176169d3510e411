//! Newline framing over fragmented byte chunks.
//!
//! Neither side of the bridge has a framing layer beyond `\n`. Reads return
//! whatever the pipe happens to hold, so a single JSON-RPC message may arrive
//! split across several chunks, or several messages may arrive in one. The
//! [`LineReassembler`] owns the pending bytes for one direction and turns each
//! chunk into zero or more complete [`Line`]s, carrying the trailing partial
//! line forward to the next call.
//!
//! Bytes are kept raw until a line is complete so that multi-byte UTF-8
//! characters straddling a chunk boundary are never corrupted.

use std::borrow::Cow;

/// Default maximum length of a single line (10 MB), excluding the newline.
///
/// A peer that streams bytes without ever sending a newline would otherwise
/// grow the pending buffer without bound.
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

/// Errors reported while reassembling lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// A line grew past the configured limit before its newline arrived.
    ///
    /// The offending bytes are discarded up to and including the next newline.
    #[error("Line exceeds maximum size of {max_bytes} bytes")]
    LineTooLarge {
        /// The configured maximum line size in bytes.
        max_bytes: usize,
    },
}

/// A single complete line, without its terminating newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    bytes: Vec<u8>,
}

impl Line {
    /// Wrap raw line bytes. The bytes must not contain `\n`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The raw bytes exactly as they arrived.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode as UTF-8, replacing malformed sequences with U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// True when the line is empty after trimming surrounding whitespace.
    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(u8::is_ascii_whitespace)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Accumulates byte chunks for one stream direction and yields complete lines.
///
/// Invariant: after every call to [`feed`](Self::feed) the internal buffer
/// holds at most one partial line, i.e. it never contains `\n`.
#[derive(Debug)]
pub struct LineReassembler {
    buf: Vec<u8>,
    max_line_bytes: usize,
    /// Set after an oversized partial line was dropped; bytes are skipped
    /// until the next newline re-synchronizes the stream.
    discarding: bool,
}

impl Default for LineReassembler {
    fn default() -> Self {
        Self::new(MAX_LINE_BYTES)
    }
}

impl LineReassembler {
    /// Create a reassembler that rejects lines longer than `max_line_bytes`.
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Append `chunk` and extract every line it completes, in stream order.
    ///
    /// Each element is either a complete line or a [`FramingError`] standing
    /// in for a line that was dropped for exceeding the size limit. Bytes
    /// after the last newline stay buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<Line, FramingError>> {
        let mut out = Vec::new();
        let mut rest = chunk;

        if self.discarding {
            match rest.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    rest = &rest[pos + 1..];
                }
                None => return out,
            }
        }

        self.buf.extend_from_slice(rest);

        let mut start = 0;
        while let Some(pos) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            if end - start > self.max_line_bytes {
                out.push(Err(FramingError::LineTooLarge {
                    max_bytes: self.max_line_bytes,
                }));
            } else {
                out.push(Ok(Line::new(self.buf[start..end].to_vec())));
            }
            start = end + 1;
        }
        self.buf.drain(..start);

        if self.buf.len() > self.max_line_bytes {
            self.buf.clear();
            self.discarding = true;
            out.push(Err(FramingError::LineTooLarge {
                max_bytes: self.max_line_bytes,
            }));
        }

        out
    }

    /// Take the unterminated remainder at end-of-stream, if any.
    pub fn finish(&mut self) -> Option<Line> {
        if self.discarding {
            self.discarding = false;
            return None;
        }
        if self.buf.is_empty() {
            return None;
        }
        Some(Line::new(std::mem::take(&mut self.buf)))
    }

    /// Number of bytes buffered but not yet part of a complete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
