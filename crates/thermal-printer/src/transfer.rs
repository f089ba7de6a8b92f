//! Paced, strictly ordered transfer of one print job.
//!
//! A session runs `Idle → SendingReset → SendingBitmap → SendingDotFeed →
//! SendingLineFeed → Idle`. Any failure moves it to `Failed`, abandons the
//! rest of the sequence and invalidates the connection session. Writes are
//! issued one at a time; the next one starts only after the previous write
//! and its pacing delay have completed.

use std::time::Duration;

use image_processor::PackedCommand;
use tracing::{debug, error, info};

use crate::link::{LinkWriter, PrinterLink, WriteMode};
use crate::options::TransferOptions;
use crate::protocol::{EscPosProtocol, PrinterProtocol};
use crate::session::ConnectionSession;
use crate::Result;

/// Transfer coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    SendingReset,
    SendingBitmap,
    SendingDotFeed,
    SendingLineFeed,
    Failed,
}

/// Summary of a completed transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Raster bytes written, header included.
    pub bitmap_bytes: usize,
    /// Number of raster chunks written.
    pub bitmap_chunks: usize,
    /// Total writes issued, commands included.
    pub writes: usize,
    /// Whether write-without-response was lost during this transfer.
    pub downgraded: bool,
}

/// Sequences reset, raster chunks and feeds over a connection session.
pub struct TransferCoordinator<P = EscPosProtocol> {
    protocol: P,
    options: TransferOptions,
    writer: LinkWriter,
    state: TransferState,
}

impl TransferCoordinator<EscPosProtocol> {
    /// Coordinator speaking ESC/POS.
    pub fn escpos(options: TransferOptions) -> Self {
        Self::new(EscPosProtocol::new(), options)
    }
}

impl<P: PrinterProtocol> TransferCoordinator<P> {
    pub fn new(protocol: P, options: TransferOptions) -> Self {
        let writer = LinkWriter::new(options.write_timeout);
        Self {
            protocol,
            options,
            writer,
            state: TransferState::Idle,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Send one print job.
    ///
    /// A missing bitmap, or one without payload, skips straight to the
    /// feeds. On failure the session is invalidated so the caller
    /// reconnects before the next job.
    pub async fn transfer<L: PrinterLink>(
        &mut self,
        session: &mut ConnectionSession<L>,
        bitmap: Option<&PackedCommand>,
    ) -> Result<TransferReport> {
        let started_unack = session.can_write_without_ack();
        let mut report = TransferReport::default();

        match self.run(session, bitmap, &mut report).await {
            Ok(()) => {
                report.downgraded = started_unack && !session.can_write_without_ack();
                self.enter(TransferState::Idle);
                info!(
                    bitmap_bytes = report.bitmap_bytes,
                    chunks = report.bitmap_chunks,
                    writes = report.writes,
                    downgraded = report.downgraded,
                    "Transfer complete"
                );
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, writes = report.writes, "Transfer failed");
                self.enter(TransferState::Failed);
                session.invalidate();
                Err(err)
            }
        }
    }

    async fn run<L: PrinterLink>(
        &mut self,
        session: &mut ConnectionSession<L>,
        bitmap: Option<&PackedCommand>,
        report: &mut TransferReport,
    ) -> Result<()> {
        self.enter(TransferState::SendingReset);
        let reset = self.protocol.reset_command();
        self.write_paced(session, &reset, report).await?;

        self.enter(TransferState::SendingBitmap);
        match bitmap {
            Some(cmd) if !cmd.payload().is_empty() => {
                self.send_chunked(session, cmd.as_bytes(), report).await?;
            }
            _ => debug!("No raster payload, skipping bitmap"),
        }

        self.enter(TransferState::SendingDotFeed);
        for cmd in self.protocol.feed_dots_commands(self.options.feed_dots) {
            self.write_paced(session, &cmd, report).await?;
        }

        self.enter(TransferState::SendingLineFeed);
        if let Some(cmd) = self.protocol.feed_lines_command(self.options.feed_lines) {
            self.write_paced(session, &cmd, report).await?;
        }

        Ok(())
    }

    /// Write `data` in consecutive chunks sized for the current write mode.
    ///
    /// The chunk size is re-read before every chunk so a mid-transfer
    /// downgrade switches to the acknowledged size right away.
    async fn send_chunked<L: PrinterLink>(
        &self,
        session: &mut ConnectionSession<L>,
        data: &[u8],
        report: &mut TransferReport,
    ) -> Result<()> {
        let total = data.len();
        let mut cursor = 0;

        while cursor < total {
            let chunk_size = self.options.chunk_size(session.preferred_mode());
            let end = (cursor + chunk_size).min(total);
            self.write_paced(session, &data[cursor..end], report).await?;

            report.bitmap_chunks += 1;
            report.bitmap_bytes += end - cursor;
            cursor = end;
            debug!(cursor, total, "Raster progress");
        }

        Ok(())
    }

    async fn write_paced<L: PrinterLink>(
        &self,
        session: &mut ConnectionSession<L>,
        data: &[u8],
        report: &mut TransferReport,
    ) -> Result<WriteMode> {
        let mode = self.writer.write_chunk(session, data).await?;
        report.writes += 1;
        pause(self.options.delay(mode)).await;
        Ok(mode)
    }

    fn enter(&mut self, state: TransferState) {
        debug!(from = ?self.state, to = ?state, "Transfer state");
        self.state = state;
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
