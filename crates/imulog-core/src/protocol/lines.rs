//! Line splitting
//!
//! Reassembles newline-terminated frames from arbitrarily chunked reads.

use crate::frame::FrameError;

/// Splits a byte stream into lines, keeping a partial tail between reads
#[derive(Debug)]
pub struct LineSplitter {
    partial: Vec<u8>,
    max_line_len: usize,
    /// Dropping the remainder of an over-long line until the next newline
    discarding: bool,
}

impl LineSplitter {
    /// Create a splitter that gives up on lines longer than `max_line_len`
    pub fn new(max_line_len: usize) -> Self {
        let max_line_len = max_line_len.max(1);
        Self {
            partial: Vec::with_capacity(max_line_len),
            max_line_len,
            discarding: false,
        }
    }

    /// Bytes buffered towards the next line
    pub fn pending(&self) -> usize {
        self.partial.len()
    }

    /// Feed newly read bytes, calling `on_line` for every complete line
    ///
    /// Lines are passed without the terminator (`\n` or `\r\n`); blank lines
    /// are skipped. An over-long partial line is reported once as
    /// [`FrameError::Overlong`] and the rest of it is dropped.
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_line: F)
    where
        F: FnMut(Result<&[u8], FrameError>),
    {
        for &byte in bytes {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else {
                    let line = match self.partial.last() {
                        Some(b'\r') => &self.partial[..self.partial.len() - 1],
                        _ => &self.partial[..],
                    };
                    if !line.is_empty() {
                        on_line(Ok(line));
                    }
                }
                self.partial.clear();
                continue;
            }

            if self.discarding {
                continue;
            }

            // A CR may sit past the limit until the next byte shows it ends the line
            let limit = self.max_line_len + usize::from(byte == b'\r');
            if self.partial.len() >= limit {
                on_line(Err(FrameError::Overlong {
                    limit: self.max_line_len,
                }));
                self.partial.clear();
                self.discarding = true;
                continue;
            }

            self.partial.push(byte);
        }
    }
}
