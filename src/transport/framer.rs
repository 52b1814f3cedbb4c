//! Line framing over partial byte streams
//!
//! Transports deliver bytes in arbitrary chunks: a single receive may carry
//! half a record, exactly one, or several. The framer accumulates chunks and
//! hands out one terminator-delimited line per call, keeping whatever follows
//! the terminator for the next call.
//!
//! ```text
//! buffer: "S;1;2;3;4\r\nS;5;6"   →  line "S;1;2;3;4", buffer "S;5;6"
//! ```

use crate::error::{Error, Result};

/// Terminator used by the TCP line protocol
pub const CRLF: &[u8] = b"\r\n";

/// Terminator used by the serial line primitive
pub const LF: &[u8] = b"\n";

/// Size of one bounded receive
pub const CHUNK_SIZE: usize = 4096;

/// Accumulating line extractor
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    terminator: &'static [u8],
    max_len: usize,
    /// Prefix of `buffer` already known not to contain the terminator
    scanned: usize,
}

impl LineFramer {
    /// Create a framer splitting on `terminator`.
    ///
    /// `max_len` bounds how many bytes may pile up without a terminator
    /// before the buffer is discarded.
    pub fn new(terminator: &'static [u8], max_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(CHUNK_SIZE),
            terminator,
            max_len,
            scanned: 0,
        }
    }

    /// Append received bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes received but not yet returned as a line
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop the first `n` pending bytes
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buffer.len());
        self.buffer.drain(..n);
        self.scanned = 0;
    }

    /// Discard everything pending
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    /// Pop the first complete line, if the buffer holds one.
    ///
    /// The returned line excludes the terminator.
    pub fn take_line(&mut self) -> Option<Vec<u8>> {
        let term_len = self.terminator.len();
        // Re-check the last term_len - 1 bytes: a terminator may straddle chunks
        let from = self.scanned.saturating_sub(term_len - 1);

        match find(&self.buffer[from..], self.terminator) {
            Some(offset) => {
                let end = from + offset;
                let line = self.buffer[..end].to_vec();
                self.buffer.drain(..end + term_len);
                self.scanned = 0;
                Some(line)
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Return the next complete line, receiving more bytes as needed.
    ///
    /// `receive` fills the given chunk and returns how many bytes it wrote.
    /// A zero-length receive means the peer closed the stream and is
    /// reported as [`Error::ConnectionClosed`].
    pub fn next_line<F>(&mut self, mut receive: F) -> Result<Vec<u8>>
    where
        F: FnMut(&mut [u8]) -> Result<usize>,
    {
        let mut chunk = [0u8; CHUNK_SIZE];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            if self.buffer.len() > self.max_len {
                log::warn!(
                    "Discarding {} buffered bytes without line terminator",
                    self.buffer.len()
                );
                self.clear();
                return Err(Error::LineTooLong(self.max_len));
            }

            let read = receive(&mut chunk)?;
            if read == 0 {
                return Err(Error::ConnectionClosed);
            }
            self.extend(&chunk[..read]);
        }
    }
}

/// Position of the first occurrence of `needle` in `haystack`
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
