//! In-memory printer link for tests.

use std::sync::Mutex;

use crate::link::{PrinterLink, WriteMode};
use crate::session::DisconnectHandle;
use crate::{PrinterError, Result};

#[derive(Default)]
struct LinkState {
    fail_unack: Vec<usize>,
    fail_ack: usize,
    hang_ack: bool,
    disconnect_after: Option<(usize, DisconnectHandle)>,
    attempts: Vec<WriteMode>,
    writes: Vec<(WriteMode, Vec<u8>)>,
}

/// Records every write and fails or hangs on request.
pub(crate) struct ScriptedLink {
    supports_unack: bool,
    state: Mutex<LinkState>,
}

impl ScriptedLink {
    pub(crate) fn new(supports_unack: bool) -> Self {
        Self {
            supports_unack,
            state: Mutex::new(LinkState::default()),
        }
    }

    /// Fail the first `n` unacknowledged writes.
    pub(crate) fn fail_unack_times(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_unack = (0..n).collect();
        self
    }

    /// Fail the unacknowledged write with the given zero-based attempt index.
    pub(crate) fn fail_unack_attempt(self, index: usize) -> Self {
        self.state.lock().unwrap().fail_unack.push(index);
        self
    }

    /// Fail the next `n` acknowledged writes.
    pub(crate) fn fail_ack_times(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_ack = n;
        self
    }

    /// Never complete acknowledged writes.
    pub(crate) fn hang_ack(self) -> Self {
        self.state.lock().unwrap().hang_ack = true;
        self
    }

    /// Flag `handle` as disconnected once `n` writes have succeeded.
    pub(crate) fn disconnect_after(&self, n: usize, handle: DisconnectHandle) {
        self.state.lock().unwrap().disconnect_after = Some((n, handle));
    }

    /// Successful writes in order.
    pub(crate) fn writes(&self) -> Vec<(WriteMode, Vec<u8>)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Attempts in the given mode, failed ones included.
    pub(crate) fn attempts(&self, mode: WriteMode) -> usize {
        let state = self.state.lock().unwrap();
        state.attempts.iter().filter(|m| **m == mode).count()
    }

    /// Concatenation of every successfully written byte.
    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.writes().into_iter().flat_map(|(_, data)| data).collect()
    }
}

impl PrinterLink for ScriptedLink {
    fn supports_write_without_response(&self) -> bool {
        self.supports_unack
    }

    async fn write(&self, data: &[u8], mode: WriteMode) -> Result<()> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            let unack_index = state
                .attempts
                .iter()
                .filter(|m| **m == WriteMode::WithoutResponse)
                .count();
            state.attempts.push(mode);
            let fail = match mode {
                WriteMode::WithoutResponse => state.fail_unack.contains(&unack_index),
                WriteMode::WithResponse if state.fail_ack > 0 => {
                    state.fail_ack -= 1;
                    true
                }
                WriteMode::WithResponse => false,
            };
            if fail {
                return Err(PrinterError::LinkWriteFailed(format!("scripted {mode:?} failure")));
            }
            if mode == WriteMode::WithResponse && state.hang_ack {
                true
            } else {
                state.writes.push((mode, data.to_vec()));
                if let Some((n, handle)) = &state.disconnect_after {
                    if state.writes.len() >= *n {
                        handle.mark_disconnected();
                    }
                }
                false
            }
        };

        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
