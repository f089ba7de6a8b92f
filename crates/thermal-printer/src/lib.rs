//! Thermal receipt printer control over a BLE write characteristic.
//!
//! Provides ESC/POS command builders, the connection session and link
//! writer with write-without-response fallback, the paced transfer
//! coordinator, and btleplug-based discovery.

pub mod ble;
pub mod link;
pub mod options;
pub mod protocol;
pub mod session;
pub mod transfer;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use ble::{BleConnection, BleLink, DiscoveredDevice, InitRetry};
pub use link::{LinkWriter, PrinterLink, WriteMode};
pub use options::TransferOptions;
pub use protocol::{EscPosProtocol, PrinterProtocol};
pub use session::{ConnectionSession, DisconnectHandle};
pub use transfer::{TransferCoordinator, TransferReport, TransferState};

/// Errors that can occur during printer operations.
#[derive(Debug, thiserror::Error)]
pub enum PrinterError {
    #[error("No printer matching '{0}' found during BLE scan")]
    DeviceNotFound(String),

    #[error("Missing write characteristic on connected device")]
    MissingCharacteristic,

    #[error("BLE connection error: {0}")]
    BleConnection(String),

    #[error("BLE scan error: {0}")]
    BleScan(String),

    #[error("Printer link is not available")]
    LinkUnavailable,

    #[error("BLE write error: {0}")]
    LinkWriteFailed(String),

    #[error("Printer disconnected during transfer")]
    DisconnectedMidTransfer,

    #[error("Write timed out after {0} ms")]
    LinkTimeout(u64),
}

impl PrinterError {
    /// The user backed out of discovery or nothing matched; not worth an error dialog.
    pub fn is_quiet_cancellation(&self) -> bool {
        matches!(self, PrinterError::DeviceNotFound(_))
    }

    /// Errors that abort an in-flight transfer and reset the session.
    pub fn is_transfer_error(&self) -> bool {
        matches!(
            self,
            PrinterError::LinkUnavailable
                | PrinterError::LinkWriteFailed(_)
                | PrinterError::DisconnectedMidTransfer
                | PrinterError::LinkTimeout(_)
        )
    }
}

/// Result type alias for printer operations.
pub type Result<T> = std::result::Result<T, PrinterError>;
