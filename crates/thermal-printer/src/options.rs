//! Transfer tuning options.
//!
//! Chunk sizes and pacing differ between acknowledged writes (write with
//! response) and unacknowledged writes (write without response). The
//! peripheral needs settling time between writes in both modes; sending
//! back-to-back overruns its receive buffer.

use std::time::Duration;

use crate::link::WriteMode;

/// Configuration options for a transfer session.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOptions {
    /// Chunk size while writes are acknowledged.
    pub ack_chunk_size: usize,

    /// Chunk size while unacknowledged writes are available.
    pub unack_chunk_size: usize,

    /// Delay after each acknowledged write.
    pub ack_delay: Duration,

    /// Delay after each unacknowledged write.
    pub unack_delay: Duration,

    /// Upper bound for a single write before it is reported as timed out.
    pub write_timeout: Duration,

    /// Dots to feed after the bitmap (capped at 1020).
    pub feed_dots: u16,

    /// Lines to feed at the end of the job (clamped to 255, 0 skips).
    pub feed_lines: u16,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            ack_chunk_size: 20,
            unack_chunk_size: 120,
            ack_delay: Duration::from_millis(30),
            unack_delay: Duration::from_millis(10),
            write_timeout: Duration::from_secs(5),
            feed_dots: 0,
            feed_lines: 3,
        }
    }
}

impl TransferOptions {
    /// Create options with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk size for the given write mode.
    pub fn chunk_size(&self, mode: WriteMode) -> usize {
        match mode {
            WriteMode::WithResponse => self.ack_chunk_size,
            WriteMode::WithoutResponse => self.unack_chunk_size,
        }
    }

    /// Pacing delay after a write in the given mode.
    pub fn delay(&self, mode: WriteMode) -> Duration {
        match mode {
            WriteMode::WithResponse => self.ack_delay,
            WriteMode::WithoutResponse => self.unack_delay,
        }
    }

    /// Builder: set acknowledged chunk size.
    ///
    /// # Panics
    /// Panics if size is zero.
    pub fn with_ack_chunk_size(mut self, size: usize) -> Self {
        assert!(size > 0, "Chunk size must be greater than 0");
        self.ack_chunk_size = size;
        self
    }

    /// Builder: set unacknowledged chunk size.
    ///
    /// # Panics
    /// Panics if size is zero.
    pub fn with_unack_chunk_size(mut self, size: usize) -> Self {
        assert!(size > 0, "Chunk size must be greater than 0");
        self.unack_chunk_size = size;
        self
    }

    /// Builder: set pacing delays (acknowledged, unacknowledged).
    pub fn with_delays(mut self, ack: Duration, unack: Duration) -> Self {
        self.ack_delay = ack;
        self.unack_delay = unack;
        self
    }

    /// Builder: set per-write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Builder: set dot feed after the bitmap.
    pub fn with_feed_dots(mut self, dots: u16) -> Self {
        self.feed_dots = dots;
        self
    }

    /// Builder: set line feed at the end of the job.
    pub fn with_feed_lines(mut self, lines: u16) -> Self {
        self.feed_lines = lines;
        self
    }
}
