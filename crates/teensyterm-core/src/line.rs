use std::time::{Duration, Instant};

/// Bytes buffered without a newline are released after this much silence.
pub const IDLE_FLUSH: Duration = Duration::from_millis(100);
/// Upper bound on a single unterminated line.
pub const MAX_PENDING: usize = 1024;

/// Splits the raw byte stream into newline-terminated lines.
///
/// Lines keep their terminator so the display and the backup file see the
/// exact bytes the device sent. Splitting is byte based: a forced flush of an
/// oversized line holds back a trailing incomplete UTF-8 sequence, but
/// UTF-16 text is only split correctly when the device sends `\n\0`
/// aligned lines.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
    last_rx: Option<Instant>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8], now: Instant) {
        if data.is_empty() {
            return;
        }
        self.buf.extend_from_slice(data);
        self.last_rx = Some(now);
    }

    /// Next complete line, or a partial one if it has gone stale.
    pub fn next_line(&mut self, now: Instant) -> Option<Vec<u8>> {
        if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            return Some(self.buf.drain(..=pos).collect());
        }
        if self.buf.is_empty() {
            return None;
        }
        let stale = self
            .last_rx
            .is_some_and(|last| now.saturating_duration_since(last) >= IDLE_FLUSH);
        if stale {
            return Some(std::mem::take(&mut self.buf));
        }
        if self.buf.len() >= MAX_PENDING {
            let cut = utf8_boundary(&self.buf);
            return Some(self.buf.drain(..cut).collect());
        }
        None
    }

    /// Everything still buffered, complete or not.
    pub fn take_pending(&mut self) -> Vec<u8> {
        self.last_rx = None;
        std::mem::take(&mut self.buf)
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Length of `buf` without a trailing, incomplete UTF-8 sequence.
fn utf8_boundary(buf: &[u8]) -> usize {
    for back in 1..=buf.len().min(3) {
        let i = buf.len() - back;
        let b = buf[i];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let need = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if need > back { i } else { buf.len() };
    }
    buf.len()
}
