//! Streaming line de-framer
//!
//! Serial reads deliver arbitrary chunks. [`LineCodec`] buffers them and
//! yields complete lines with the CR-LF terminator stripped.

use crate::error::ParseError;

/// Longest line accepted before the buffer is discarded
pub const MAX_LINE_LEN: usize = 256;

/// Streaming CR-LF line codec
#[derive(Debug)]
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    /// Create a new line codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Push raw bytes into the codec buffer
    ///
    /// If the buffer grows past [`MAX_LINE_LEN`] without a terminator, the
    /// unterminated data is discarded and an error is returned. Complete
    /// lines already in the buffer are kept.
    pub fn push_bytes(&mut self, data: &[u8]) -> Result<(), ParseError> {
        self.buffer.extend_from_slice(data);

        let tail_start = self
            .buffer
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);

        let unterminated = self.buffer.len() - tail_start;
        if unterminated > MAX_LINE_LEN {
            tracing::warn!("Discarding {} bytes without a line terminator", unterminated);
            self.buffer.truncate(tail_start);
            return Err(ParseError::LineTooLong(MAX_LINE_LEN));
        }
        Ok(())
    }

    /// Extract the next complete line, if available
    ///
    /// Lines are split on LF; a CR immediately before it is stripped. Bytes
    /// that are not valid UTF-8 are replaced rather than rejected.
    pub fn next_line(&mut self) -> Option<String> {
        let term_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=term_pos).collect();

        let mut end = line_bytes.len() - 1;
        if end > 0 && line_bytes[end - 1] == b'\r' {
            end -= 1;
        }
        Some(String::from_utf8_lossy(&line_bytes[..end]).into_owned())
    }

    /// Number of buffered bytes not yet returned as a line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}
