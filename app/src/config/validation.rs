//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_MAC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9A-Fa-f]{2}[:\-]){5}([0-9A-Fa-f]{2})$").unwrap());
static RE_PARTIAL_MAC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9A-Fa-f]{1,2}:)+[0-9A-Fa-f]{0,2}$").unwrap());
static RE_UUID_NO_HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]{32}$").unwrap());
static RE_UUID_HYPHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
        .unwrap()
});

/// Longest device name a BLE advertisement can carry.
const MAX_DEVICE_NAME_LEN: usize = 248;

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "PRINTER_ADDRESS" => validate_printer_target(value)?,
        "PRINT_WIDTH" => {
            if value != "384" && value != "576" {
                return Err("must be 384 (58mm) or 576 (80mm)".into());
            }
        }
        "DITHER_THRESHOLD" => validate_int_range(value, 0, 255)?,
        "WHITE_THRESHOLD" => {
            let v: f64 = value.parse().map_err(|_| "must be a float")?;
            if !(0.0..=255.0).contains(&v) {
                return Err("must be between 0.0 and 255.0".into());
            }
        }
        "UNACK_CHUNK_SIZE" => validate_int_range(value, 1, 512)?,
        "FEED_DOTS" => validate_int_range(value, 0, 1020)?,
        "FEED_LINES" => validate_int_range(value, 0, 255)?,
        "WRITE_TIMEOUT_MS" => validate_int_range(value, 100, 60_000)?,
        "SCAN_TIMEOUT_SECS" => validate_int_range(value, 1, 120)?,
        "DRY_RUN_MODE" => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

/// Accept a MAC, a platform UUID or an advertised device name.
fn validate_printer_target(value: &str) -> Result<(), String> {
    if value.is_empty()
        || RE_MAC.is_match(value)
        || RE_UUID_NO_HYPHEN.is_match(value)
        || RE_UUID_HYPHEN.is_match(value)
    {
        return Ok(());
    }
    if RE_PARTIAL_MAC.is_match(value) {
        return Err("invalid address format (expected MAC or UUID)".into());
    }
    if value.len() > MAX_DEVICE_NAME_LEN || value.chars().any(char::is_control) {
        return Err(format!(
            "device name must be 1-{MAX_DEVICE_NAME_LEN} printable characters"
        ));
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i32, max: i32) -> Result<(), String> {
    let v: i32 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
