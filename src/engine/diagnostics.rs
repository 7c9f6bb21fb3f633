//! Incremental decoding of the encoder's diagnostic stream

use std::collections::VecDeque;

/// Longest line kept before a forced split
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into lines on `\r` or `\n`
///
/// ffmpeg rewrites its status line with bare carriage returns, so both
/// terminators count. Bytes are decoded lossily; empty lines are dropped.
#[derive(Debug)]
pub struct LineDecoder {
    buf: Vec<u8>,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line: max_line.max(1),
        }
    }

    /// Feed a chunk; returns every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\r' || byte == b'\n' {
                self.take_into(&mut lines);
            } else {
                self.buf.push(byte);
                if self.buf.len() >= self.max_line {
                    self.take_into(&mut lines);
                }
            }
        }
        lines
    }

    /// Flush the unterminated remainder at end of stream
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.take_into(&mut lines);
        lines.pop()
    }

    fn take_into(&mut self, lines: &mut Vec<String>) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf).trim_end().to_string();
        self.buf.clear();
        if !line.is_empty() {
            lines.push(line);
        }
    }
}

/// The last `capacity` diagnostic lines
#[derive(Debug, Clone)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined with `\n`, oldest first
    pub fn text(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_cr_and_lf() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"first\r\nsecond\rthird\n\n");
        assert_eq!(lines, vec!["first", "second", "third"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_partial_lines_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"frame=  1 ti").is_empty());
        assert_eq!(decoder.push(b"me=00:00:01.00\rfra"), vec!["frame=  1 time=00:00:01.00"]);
        assert_eq!(decoder.finish(), Some("fra".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"bad \xff byte\n");
        assert_eq!(lines, vec!["bad \u{fffd} byte"]);
    }

    #[test]
    fn test_overlong_line_is_split() {
        let mut decoder = LineDecoder::with_max_line(4);
        let lines = decoder.push(b"abcdefghij");
        assert_eq!(lines, vec!["abcd", "efgh"]);
        assert_eq!(decoder.finish(), Some("ij".to_string()));
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let mut tail = DiagnosticTail::new(2);
        for line in ["a", "b", "c"] {
            tail.push(line.to_string());
        }
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.text(), "b\nc");

        let mut none = DiagnosticTail::new(0);
        none.push("x".to_string());
        assert!(none.is_empty());
    }
}
