//! Newline framing for tokio.

use std::borrow::Cow;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::config::DEFAULT_MAX_LINE_LEN;
use crate::error::{self, ProtocolError};

/// Splits a byte stream on `\n`, dropping an optional preceding `\r`, and
/// terminates outgoing lines with `\r\n`.
///
/// Invalid UTF-8 is replaced with U+FFFD rather than rejected. A line longer
/// than the limit is skipped up to its terminator and decoding continues
/// with the next line; the same lines come out no matter how the input is
/// split across reads.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
    /// Inside an overlong line whose terminator has not arrived yet.
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Codec accepting lines of at most `max_len` bytes, terminator excluded.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn finish_line(&self, raw: &[u8]) -> Option<String> {
        let body = raw.strip_suffix(b"\n").unwrap_or(raw);
        let body = body.strip_suffix(b"\r").unwrap_or(body);
        if body.len() > self.max_len {
            let err = ProtocolError::LineTooLong {
                actual: body.len(),
                limit: self.max_len,
            };
            warn!("dropping line: {}", err);
            return None;
        }
        Some(match String::from_utf8_lossy(body) {
            Cow::Borrowed(s) => s.to_string(),
            Cow::Owned(s) => {
                warn!(line = %s, "line is not valid UTF-8; decoded lossily");
                s
            }
        })
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            match src[self.next_index..].iter().position(|b| *b == b'\n') {
                Some(offset) => {
                    let line = src.split_to(self.next_index + offset + 1);
                    self.next_index = 0;
                    if self.discarding {
                        self.discarding = false;
                        continue;
                    }
                    match self.finish_line(&line) {
                        Some(line) => return Ok(Some(line)),
                        None => continue,
                    }
                }
                None => {
                    // body plus a pending `\r` may legitimately reach max_len + 1
                    if self.discarding || src.len() > self.max_len + 1 {
                        if !self.discarding {
                            let err = ProtocolError::LineTooLong {
                                actual: src.len(),
                                limit: self.max_len,
                            };
                            warn!("discarding until next line: {}", err);
                            self.discarding = true;
                        }
                        src.clear();
                        self.next_index = 0;
                    } else {
                        self.next_index = src.len();
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        self.next_index = 0;
        if std::mem::take(&mut self.discarding) {
            return Ok(None);
        }
        Ok(self.finish_line(&rest))
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
