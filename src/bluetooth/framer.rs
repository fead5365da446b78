// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Turns raw read chunks into trimmed text records.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How record boundaries are found in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Every read result is one record.
    PerRead,
    /// Records end at the delimiter byte and may span reads.
    Delimited,
}

/// What to do with bytes that are not valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidUtf8Policy {
    /// Decode lossily, invalid sequences become U+FFFD.
    Replace,
    /// Drop the whole record.
    Skip,
}

/// Framer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerOptions {
    pub mode: FramingMode,
    pub delimiter: u8,
    pub max_record_len: usize,
    pub invalid_utf8: InvalidUtf8Policy,
}

impl Default for FramerOptions {
    fn default() -> Self {
        Self {
            mode: FramingMode::PerRead,
            delimiter: b'\n',
            max_record_len: 1024,
            invalid_utf8: InvalidUtf8Policy::Replace,
        }
    }
}

/// Accumulates bytes from a session's reads and yields text records.
///
/// One framer belongs to one session; [`LineFramer::reset`] discards any
/// partial record when a stream is replaced.
pub struct LineFramer {
    buffer: Vec<u8>,
    options: FramerOptions,
    decode_failures: u64,
}

impl LineFramer {
    /// Create a new framer.
    pub fn new(options: FramerOptions) -> Self {
        Self {
            buffer: Vec::with_capacity(options.max_record_len.min(4096)),
            options,
            decode_failures: 0,
        }
    }

    /// Process one read result.
    ///
    /// Returns the trimmed, non-empty records completed by this chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        match self.options.mode {
            FramingMode::PerRead => self.decode(chunk).into_iter().collect(),
            FramingMode::Delimited => self.push_delimited(chunk),
        }
    }

    fn push_delimited(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut records = Vec::new();

        for &byte in chunk {
            if byte == self.options.delimiter {
                let bytes = std::mem::take(&mut self.buffer);
                records.extend(self.decode(&bytes));
                continue;
            }

            self.buffer.push(byte);
            if self.buffer.len() >= self.options.max_record_len {
                warn!(
                    "Record exceeded {} bytes without delimiter, flushing",
                    self.options.max_record_len
                );
                let bytes = std::mem::take(&mut self.buffer);
                records.extend(self.decode(&bytes));
            }
        }

        records
    }

    /// Flush a trailing partial record, used when the peer closes the stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let bytes = std::mem::take(&mut self.buffer);
        self.decode(&bytes)
    }

    fn decode(&mut self, bytes: &[u8]) -> Option<String> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => {
                self.decode_failures += 1;
                match self.options.invalid_utf8 {
                    InvalidUtf8Policy::Replace => {
                        debug!("Replacing invalid UTF-8 in {} byte record", bytes.len());
                        String::from_utf8_lossy(bytes).into_owned()
                    }
                    InvalidUtf8Policy::Skip => {
                        warn!("Skipping {} byte record with invalid UTF-8", bytes.len());
                        return None;
                    }
                }
            }
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Discard any partial record.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes held for an incomplete record.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of records that were not valid UTF-8.
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(FramerOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delimited() -> LineFramer {
        LineFramer::new(FramerOptions {
            mode: FramingMode::Delimited,
            ..FramerOptions::default()
        })
    }

    #[test]
    fn test_per_read_trims_each_chunk() {
        let mut framer = LineFramer::default();
        assert_eq!(framer.push(b"42\n"), vec!["42".to_string()]);
        assert_eq!(framer.push(b"  ok \r\n"), vec!["ok".to_string()]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_per_read_does_not_reassemble() {
        let mut framer = LineFramer::default();
        assert_eq!(framer.push(b"12"), vec!["12".to_string()]);
        assert_eq!(framer.push(b"34\n"), vec!["34".to_string()]);
    }

    #[test]
    fn test_whitespace_only_chunk_yields_nothing() {
        let mut framer = LineFramer::default();
        assert!(framer.push(b" \r\n\t").is_empty());
        assert!(framer.push(b"").is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut framer = LineFramer::default();
        let records = framer.push(&[b'a', 0xFF, b'b']);
        assert_eq!(records, vec!["a\u{FFFD}b".to_string()]);
        assert_eq!(framer.decode_failures(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let mut framer = LineFramer::new(FramerOptions {
            invalid_utf8: InvalidUtf8Policy::Skip,
            ..FramerOptions::default()
        });
        assert!(framer.push(&[0xC3, 0x28]).is_empty());
        assert_eq!(framer.push(b"7"), vec!["7".to_string()]);
        assert_eq!(framer.decode_failures(), 1);
    }

    #[test]
    fn test_delimited_reassembles_across_reads() {
        let mut framer = delimited();
        assert!(framer.push(b"12").is_empty());
        assert_eq!(framer.pending_len(), 2);
        assert_eq!(framer.push(b"34\n5"), vec!["1234".to_string()]);
        assert_eq!(framer.push(b"6\nok\n"), vec!["56".to_string(), "ok".to_string()]);
    }

    #[test]
    fn test_delimited_skips_blank_lines() {
        let mut framer = delimited();
        assert_eq!(framer.push(b"\n\r\n1\n\n"), vec!["1".to_string()]);
    }

    #[test]
    fn test_delimited_flushes_oversized_record() {
        let mut framer = LineFramer::new(FramerOptions {
            mode: FramingMode::Delimited,
            max_record_len: 4,
            ..FramerOptions::default()
        });
        assert_eq!(framer.push(b"abcdef"), vec!["abcd".to_string()]);
        assert_eq!(framer.push(b"\n"), vec!["ef".to_string()]);
    }

    #[test]
    fn test_finish_and_reset() {
        let mut framer = delimited();
        framer.push(b"partial");
        assert_eq!(framer.finish(), Some("partial".to_string()));
        assert_eq!(framer.finish(), None);

        framer.push(b"stale");
        framer.reset();
        assert_eq!(framer.pending_len(), 0);
        assert_eq!(framer.push(b"fresh\n"), vec!["fresh".to_string()]);
    }
}
