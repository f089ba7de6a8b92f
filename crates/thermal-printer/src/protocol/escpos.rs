//! ESC/POS command subset for BLE receipt printers.
//!
//! Service UUID: 18f0
//! Write characteristic UUID: 2af1

use super::PrinterProtocol;

/// BLE service UUID advertised by ESC/POS receipt printers.
pub const SERVICE_UUID: uuid::Uuid =
    uuid::Uuid::from_u128(0x0000_18f0_0000_1000_8000_0080_5f9b_34fb);

/// Writable characteristic receiving print data.
pub const WRITE_CHARACTERISTIC: uuid::Uuid =
    uuid::Uuid::from_u128(0x0000_2af1_0000_1000_8000_0080_5f9b_34fb);

const ESC: u8 = 0x1b;

/// `ESC @`: initialize printer.
const CMD_RESET: [u8; 2] = [ESC, 0x40];
/// `ESC J n`: feed n dots.
const CMD_FEED_DOTS: u8 = 0x4a;
/// `ESC d n`: feed n lines.
const CMD_FEED_LINES: u8 = 0x64;

/// Most dots a single `ESC J` can feed.
const MAX_DOTS_PER_COMMAND: u16 = 255;

/// Total dot feed allowed per request (four commands).
pub const MAX_FEED_DOTS: u16 = 1020;

/// Most lines a single `ESC d` can feed.
const MAX_FEED_LINES: u16 = 255;

/// `ESC @`
pub fn reset() -> Vec<u8> {
    CMD_RESET.to_vec()
}

/// Split a dot feed into `ESC J n` commands of at most 255 dots each.
///
/// The total is capped at [`MAX_FEED_DOTS`]; zero dots yields no commands.
pub fn feed_dots(dots: u16) -> Vec<Vec<u8>> {
    let mut remaining = dots.min(MAX_FEED_DOTS);
    let mut cmds = Vec::new();
    while remaining > 0 {
        let n = remaining.min(MAX_DOTS_PER_COMMAND);
        cmds.push(vec![ESC, CMD_FEED_DOTS, n as u8]);
        remaining -= n;
    }
    cmds
}

/// `ESC d n` with n clamped to 255; `None` when there is nothing to feed.
pub fn feed_lines(lines: u16) -> Option<Vec<u8>> {
    if lines == 0 {
        return None;
    }
    let n = lines.min(MAX_FEED_LINES) as u8;
    Some(vec![ESC, CMD_FEED_LINES, n])
}

/// ESC/POS protocol implementation.
#[derive(Debug, Clone, Default)]
pub struct EscPosProtocol;

impl EscPosProtocol {
    pub fn new() -> Self {
        Self
    }
}

impl PrinterProtocol for EscPosProtocol {
    fn name(&self) -> &str {
        "ESC/POS"
    }

    fn service_uuid(&self) -> uuid::Uuid {
        SERVICE_UUID
    }

    fn write_characteristic(&self) -> uuid::Uuid {
        WRITE_CHARACTERISTIC
    }

    fn reset_command(&self) -> Vec<u8> {
        reset()
    }

    fn feed_dots_commands(&self, dots: u16) -> Vec<Vec<u8>> {
        feed_dots(dots)
    }

    fn feed_lines_command(&self, lines: u16) -> Option<Vec<u8>> {
        feed_lines(lines)
    }
}
