//! Wire format: newline-delimited JSON envelopes.
//!
//! Each message on the wire is:
//!   [compact JSON object][b'\n']
//!
//! Compact JSON escapes newlines inside strings, so the delimiter never
//! appears inside a record. A `\r` before the delimiter is tolerated and
//! blank lines are skipped.

use peripheral_share_types::Envelope;

use crate::error::{DecodeError, ProtocolError};

/// Record terminator.
pub const DELIMITER: u8 = b'\n';

/// Maximum record size (1 MiB). Prevents unbounded buffering.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Bytes requested from the transport per read.
pub const READ_CHUNK: usize = 4096;

/// Encode an envelope as one delimited record.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes =
        serde_json::to_vec(envelope).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
    bytes.push(DELIMITER);
    Ok(bytes)
}

/// Outcome of decoding the front of a buffer.
#[derive(Debug)]
pub enum Decoded<'a> {
    /// A complete envelope and the bytes after its delimiter.
    Envelope(Envelope, &'a [u8]),
    /// A complete but unparseable record and the bytes after its delimiter.
    Malformed(DecodeError, &'a [u8]),
    /// No complete record is buffered yet.
    NeedMoreData,
}

/// Decode the first complete record in `buf`.
pub fn decode(buf: &[u8]) -> Decoded<'_> {
    let mut rest = buf;
    loop {
        let Some(end) = rest.iter().position(|&b| b == DELIMITER) else {
            return Decoded::NeedMoreData;
        };
        let record = &rest[..end];
        let record = record.strip_suffix(b"\r").unwrap_or(record);
        rest = &rest[end + 1..];

        if record.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        return match serde_json::from_slice(record) {
            Ok(envelope) => Decoded::Envelope(envelope, rest),
            Err(e) => Decoded::Malformed(
                DecodeError::Malformed {
                    bytes: record.to_vec(),
                    reason: e.to_string(),
                },
                rest,
            ),
        };
    }
}

/// Resumable decoder over a growing receive buffer.
///
/// Append each read with [`extend`](Self::extend), then call
/// [`next_envelope`](Self::next_envelope) until it returns `None`.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_frame: usize,
    /// Prefix of `buf` already known to hold no complete record.
    scanned: usize,
    /// Set after an oversized frame: drop bytes until the next delimiter.
    discarding: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            buf: Vec::with_capacity(READ_CHUNK),
            max_frame,
            scanned: 0,
            discarding: false,
        }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next envelope, or `None` if more data is needed.
    pub fn next_envelope(&mut self) -> Option<Result<Envelope, DecodeError>> {
        if self.discarding {
            match self.buf.iter().position(|&b| b == DELIMITER) {
                Some(end) => {
                    self.buf.drain(..=end);
                    self.discarding = false;
                }
                None => {
                    self.buf.clear();
                    return None;
                }
            }
        }

        if !self.buf[self.scanned..].contains(&DELIMITER) {
            self.scanned = self.buf.len();
            return self.check_oversized();
        }

        let (result, rest_len) = match decode(&self.buf) {
            Decoded::Envelope(envelope, rest) => (Ok(envelope), rest.len()),
            Decoded::Malformed(error, rest) => (Err(error), rest.len()),
            Decoded::NeedMoreData => {
                // Only blank lines were complete.
                self.scanned = self.buf.len();
                return self.check_oversized();
            }
        };
        let consumed = self.buf.len() - rest_len;
        self.buf.drain(..consumed);
        self.scanned = 0;
        Some(result)
    }

    fn check_oversized(&mut self) -> Option<Result<Envelope, DecodeError>> {
        if self.buf.len() <= self.max_frame {
            return None;
        }
        let discarded = self.buf.len();
        self.buf.clear();
        self.scanned = 0;
        self.discarding = true;
        Some(Err(DecodeError::Oversized {
            discarded,
            max: self.max_frame,
        }))
    }
}
