//! Printer protocol definitions.
//!
//! Only the ESC/POS subset used for receipt printing is implemented:
//! raster image (`GS v 0`, packed by `image-processor`), reset, dot feed
//! and line feed.

pub mod escpos;

pub use escpos::EscPosProtocol;

/// Trait defining the interface for printer protocol implementations.
///
/// Supplies the BLE identifiers used during discovery and the auxiliary
/// commands the transfer coordinator sends around the raster payload.
pub trait PrinterProtocol: Send + Sync {
    /// Human-readable protocol name.
    fn name(&self) -> &str;

    /// BLE service UUID used to discover the printer.
    fn service_uuid(&self) -> uuid::Uuid;

    /// Writable characteristic UUID that receives print data.
    fn write_characteristic(&self) -> uuid::Uuid;

    /// Command that resets the printer to its power-on state.
    fn reset_command(&self) -> Vec<u8>;

    /// Commands feeding the paper by `dots` dot rows.
    fn feed_dots_commands(&self, dots: u16) -> Vec<Vec<u8>>;

    /// Command feeding the paper by `lines` text lines, if any.
    fn feed_lines_command(&self, lines: u16) -> Option<Vec<u8>>;
}
