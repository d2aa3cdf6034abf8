//! Incremental splitting of inbound bytes into text lines.

/// Accumulates bytes and yields complete `\n` or `\r` terminated lines.
///
/// A line that grows past the limit is discarded and counted as oversized;
/// bytes up to the next terminator belong to the discarded line.
#[derive(Debug)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
    max_line_bytes: usize,
    discarding: bool,
}

/// Lines completed by one [`LineBuffer::push`].
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct LineBatch {
    pub(crate) lines: Vec<String>,
    pub(crate) oversized: usize,
}

impl LineBuffer {
    pub(crate) const fn new(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) -> LineBatch {
        let mut batch = LineBatch::default();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                if self.discarding {
                    self.discarding = false;
                } else if !self.pending.is_empty() {
                    batch
                        .lines
                        .push(String::from_utf8_lossy(&self.pending).into_owned());
                }
                self.pending.clear();
                continue;
            }
            if self.discarding {
                continue;
            }
            self.pending.push(byte);
            if self.pending.len() > self.max_line_bytes {
                self.pending.clear();
                self.discarding = true;
                batch.oversized += 1;
            }
        }
        batch
    }

    /// Returns the unterminated remainder, if any, once the peer has closed.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let discarding = std::mem::replace(&mut self.discarding, false);
        if discarding || self.pending.is_empty() {
            self.pending.clear();
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}
