//! Connection state shared by the link writer and transfer coordinator.
//!
//! One session per connection: it owns the link, the negotiated
//! write-without-response capability and the disconnect flag. Nothing here
//! is global; callers pass the session explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::link::{PrinterLink, WriteMode};

/// Cloneable handle used to report a disconnect from outside the session.
#[derive(Debug, Clone, Default)]
pub struct DisconnectHandle(Arc<AtomicBool>);

impl DisconnectHandle {
    pub fn mark_disconnected(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_disconnected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State of one connection to a printer.
pub struct ConnectionSession<L> {
    link: Option<L>,
    can_write_without_ack: bool,
    disconnected: DisconnectHandle,
}

impl<L: PrinterLink> ConnectionSession<L> {
    /// Start a session over a freshly connected link.
    ///
    /// The capability flag is read from the link's advertised properties.
    pub fn new(link: L) -> Self {
        Self::watched(link, DisconnectHandle::default())
    }

    /// Start a session whose disconnect flag is already shared with a watcher.
    pub fn watched(link: L, disconnected: DisconnectHandle) -> Self {
        let can_write_without_ack = link.supports_write_without_response();
        info!(can_write_without_ack, "Printer session established");
        Self {
            link: Some(link),
            can_write_without_ack,
            disconnected,
        }
    }

    /// A session with no connection; every write fails with `LinkUnavailable`.
    pub fn disconnected() -> Self {
        Self {
            link: None,
            can_write_without_ack: false,
            disconnected: DisconnectHandle::default(),
        }
    }

    pub fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    /// Whether the next write may use write-without-response.
    pub fn can_write_without_ack(&self) -> bool {
        self.can_write_without_ack
    }

    /// Write mode the next chunk will be attempted with.
    pub fn preferred_mode(&self) -> WriteMode {
        if self.can_write_without_ack {
            WriteMode::WithoutResponse
        } else {
            WriteMode::WithResponse
        }
    }

    /// Handle for a disconnect watcher to flag this session.
    pub fn disconnect_handle(&self) -> DisconnectHandle {
        self.disconnected.clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.is_disconnected()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some() && !self.is_disconnected()
    }

    /// Permanently stop using write-without-response on this connection.
    pub fn downgrade(&mut self) {
        if self.can_write_without_ack {
            warn!("Write without response failed, falling back to acknowledged writes");
            self.can_write_without_ack = false;
        }
    }

    /// Retire the session after a failed transfer so the next print reconnects.
    ///
    /// Further writes fail with `DisconnectedMidTransfer`. The link stays in
    /// place so the owner can still take it and close the connection.
    pub fn invalidate(&mut self) {
        if self.link.is_some() && !self.is_disconnected() {
            info!("Printer session invalidated");
        }
        self.can_write_without_ack = false;
        self.disconnected.mark_disconnected();
    }

    /// Take the link out of the session, e.g. to disconnect it.
    pub fn take_link(&mut self) -> Option<L> {
        self.can_write_without_ack = false;
        self.disconnected.mark_disconnected();
        self.link.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLink;

    #[test]
    fn test_capability_read_from_link() {
        let session = ConnectionSession::new(ScriptedLink::new(true));
        assert!(session.can_write_without_ack());
        assert_eq!(session.preferred_mode(), WriteMode::WithoutResponse);

        let session = ConnectionSession::new(ScriptedLink::new(false));
        assert!(!session.can_write_without_ack());
        assert_eq!(session.preferred_mode(), WriteMode::WithResponse);
    }

    #[test]
    fn test_downgrade_is_permanent() {
        let mut session = ConnectionSession::new(ScriptedLink::new(true));
        session.downgrade();
        assert!(!session.can_write_without_ack());
        session.downgrade();
        assert!(!session.can_write_without_ack());
    }

    #[test]
    fn test_disconnect_handle_flags_session() {
        let session = ConnectionSession::new(ScriptedLink::new(true));
        let handle = session.disconnect_handle();
        assert!(session.is_connected());
        handle.mark_disconnected();
        assert!(session.is_disconnected());
        assert!(!session.is_connected());
    }

    #[test]
    fn test_watched_session_shares_handle() {
        let handle = DisconnectHandle::default();
        let session = ConnectionSession::watched(ScriptedLink::new(false), handle.clone());
        assert!(session.is_connected());
        handle.mark_disconnected();
        assert!(!session.is_connected());
    }

    #[test]
    fn test_invalidate_keeps_link_for_disconnect() {
        let mut session = ConnectionSession::new(ScriptedLink::new(true));
        session.invalidate();
        assert!(!session.can_write_without_ack());
        assert!(!session.is_connected());
        assert!(session.take_link().is_some());
        assert!(session.take_link().is_none());
    }

    #[test]
    fn test_disconnected_session_has_no_link() {
        let session = ConnectionSession::<ScriptedLink>::disconnected();
        assert!(session.link().is_none());
        assert!(!session.is_connected());
    }
}
