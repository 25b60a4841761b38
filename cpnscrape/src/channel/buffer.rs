//! Output accumulation with tail-only prompt search.
//!
//! Prompts only ever appear at the end of the output, so only the last
//! `search_depth` bytes are searched. Long `show logging` dumps would
//! otherwise be rescanned on every chunk.

use std::fmt;

use bytes::BytesMut;
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Collects printable output from a terminal stream.
///
/// Escape sequences (colors, cursor movement) are removed as the data
/// arrives. The vte parser keeps its state between calls, so a sequence
/// split across two chunks is still removed.
pub struct PatternBuffer {
    buffer: BytesMut,
    parser: Parser,
    search_depth: usize,
}

/// vte performer that keeps printable text and line control characters.
struct Printable<'a>(&'a mut BytesMut);

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.0.extend_from_slice(&[byte]);
        }
    }
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            parser: Parser::new(),
            search_depth,
        }
    }

    /// Append raw terminal output, stripping escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printable = Printable(&mut self.buffer);
        self.parser.advance(&mut printable, data);
    }

    /// Search the last `search_depth` bytes for `pattern`.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern.is_match(&self.buffer[start..])
    }

    /// Take the accumulated output, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}
