//! Single-chunk delivery over the printer link.
//!
//! Write-without-response is tried first when the connection advertises
//! it. Any failure in that mode downgrades the session for good and the
//! same chunk is retried once with an acknowledged write.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::session::ConnectionSession;
use crate::{PrinterError, Result};

/// GATT write mode for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Acknowledged write; waits for the peripheral's confirmation.
    WithResponse,
    /// Unacknowledged write; returns once buffered locally.
    WithoutResponse,
}

/// A writable characteristic on a connected printer.
pub trait PrinterLink: Send + Sync {
    /// Whether the characteristic advertises write-without-response.
    fn supports_write_without_response(&self) -> bool;

    /// Write one chunk in the given mode.
    fn write(&self, data: &[u8], mode: WriteMode) -> impl Future<Output = Result<()>> + Send;
}

/// Delivers chunks through a [`ConnectionSession`], bounding each attempt.
#[derive(Debug, Clone)]
pub struct LinkWriter {
    write_timeout: Duration,
}

impl LinkWriter {
    pub fn new(write_timeout: Duration) -> Self {
        Self { write_timeout }
    }

    /// Write one chunk, returning the mode that succeeded.
    ///
    /// Fails with `LinkUnavailable` when there is no link,
    /// `DisconnectedMidTransfer` once a disconnect was observed, and
    /// `LinkWriteFailed`/`LinkTimeout` when the acknowledged write fails.
    pub async fn write_chunk<L: PrinterLink>(
        &self,
        session: &mut ConnectionSession<L>,
        chunk: &[u8],
    ) -> Result<WriteMode> {
        if session.is_disconnected() {
            return Err(PrinterError::DisconnectedMidTransfer);
        }

        if session.can_write_without_ack() {
            let link = session.link().ok_or(PrinterError::LinkUnavailable)?;
            let result = self.attempt(link, chunk, WriteMode::WithoutResponse).await;
            match result {
                Ok(()) => return Ok(WriteMode::WithoutResponse),
                Err(err) => {
                    warn!(error = %err, len = chunk.len(), "Unacknowledged write failed");
                    session.downgrade();
                }
            }
        }

        let link = session.link().ok_or(PrinterError::LinkUnavailable)?;
        self.attempt(link, chunk, WriteMode::WithResponse)
            .await
            .map_err(|err| match err {
                PrinterError::LinkTimeout(_) | PrinterError::LinkWriteFailed(_) => err,
                other => PrinterError::LinkWriteFailed(other.to_string()),
            })?;

        if session.is_disconnected() {
            return Err(PrinterError::DisconnectedMidTransfer);
        }
        Ok(WriteMode::WithResponse)
    }

    async fn attempt<L: PrinterLink>(&self, link: &L, chunk: &[u8], mode: WriteMode) -> Result<()> {
        debug!(len = chunk.len(), ?mode, "Writing chunk");
        match tokio::time::timeout(self.write_timeout, link.write(chunk, mode)).await {
            Ok(result) => result,
            Err(_) => Err(PrinterError::LinkTimeout(self.write_timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLink;

    fn writer() -> LinkWriter {
        LinkWriter::new(Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_write_used_when_available() {
        let mut session = ConnectionSession::new(ScriptedLink::new(true));
        let mode = writer().write_chunk(&mut session, &[1, 2, 3]).await.unwrap();

        assert_eq!(mode, WriteMode::WithoutResponse);
        let writes = session.link().unwrap().writes();
        assert_eq!(writes, vec![(WriteMode::WithoutResponse, vec![1, 2, 3])]);
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledged_write_when_capability_absent() {
        let mut session = ConnectionSession::new(ScriptedLink::new(false));
        let mode = writer().write_chunk(&mut session, &[9]).await.unwrap();

        assert_eq!(mode, WriteMode::WithResponse);
        assert_eq!(session.link().unwrap().attempts(WriteMode::WithoutResponse), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_unacknowledged_write_falls_back() {
        let link = ScriptedLink::new(true).fail_unack_times(1);
        let mut session = ConnectionSession::new(link);

        let mode = writer().write_chunk(&mut session, &[7, 7]).await.unwrap();
        assert_eq!(mode, WriteMode::WithResponse);
        assert!(!session.can_write_without_ack());

        // The same chunk was delivered once, acknowledged
        let writes = session.link().unwrap().writes();
        assert_eq!(writes, vec![(WriteMode::WithResponse, vec![7, 7])]);
    }

    #[tokio::test(start_paused = true)]
    async fn downgrade_is_sticky_for_later_chunks() {
        let link = ScriptedLink::new(true).fail_unack_times(1);
        let mut session = ConnectionSession::new(link);
        let writer = writer();

        writer.write_chunk(&mut session, &[1]).await.unwrap();
        writer.write_chunk(&mut session, &[2]).await.unwrap();
        writer.write_chunk(&mut session, &[3]).await.unwrap();

        assert_eq!(session.link().unwrap().attempts(WriteMode::WithoutResponse), 1);
        assert_eq!(session.link().unwrap().attempts(WriteMode::WithResponse), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn both_modes_failing_reports_write_failure() {
        let link = ScriptedLink::new(true).fail_unack_times(1).fail_ack_times(1);
        let mut session = ConnectionSession::new(link);

        let err = writer().write_chunk(&mut session, &[1]).await.unwrap_err();
        assert!(matches!(err, PrinterError::LinkWriteFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_link_is_unavailable() {
        let mut session = ConnectionSession::<ScriptedLink>::disconnected();

        let err = writer().write_chunk(&mut session, &[1]).await.unwrap_err();
        assert!(matches!(err, PrinterError::LinkUnavailable));
    }

    #[tokio::test(start_paused = true)]
    async fn taken_link_counts_as_disconnect() {
        let mut session = ConnectionSession::new(ScriptedLink::new(true));
        session.take_link();

        let err = writer().write_chunk(&mut session, &[1]).await.unwrap_err();
        assert!(matches!(err, PrinterError::DisconnectedMidTransfer));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_session_fails_without_writing() {
        let mut session = ConnectionSession::new(ScriptedLink::new(true));
        session.disconnect_handle().mark_disconnected();

        let err = writer().write_chunk(&mut session, &[1]).await.unwrap_err();
        assert!(matches!(err, PrinterError::DisconnectedMidTransfer));
        assert!(session.link().unwrap().writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_acknowledged_write_times_out() {
        let link = ScriptedLink::new(false).hang_ack();
        let mut session = ConnectionSession::new(link);

        let err = LinkWriter::new(Duration::from_millis(250))
            .write_chunk(&mut session, &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, PrinterError::LinkTimeout(250)));
    }
}
