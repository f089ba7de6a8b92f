//! Runtime application configuration loaded from environment variables.

use std::time::Duration;

use image_processor::{PaperWidth, PipelineConfig};
use thermal_printer::TransferOptions;

use super::validation::validate_setting;

const SETTING_KEYS: [&str; 10] = [
    "PRINTER_ADDRESS",
    "PRINT_WIDTH",
    "DITHER_THRESHOLD",
    "WHITE_THRESHOLD",
    "UNACK_CHUNK_SIZE",
    "FEED_DOTS",
    "FEED_LINES",
    "WRITE_TIMEOUT_MS",
    "SCAN_TIMEOUT_SECS",
    "DRY_RUN_MODE",
];

/// Runtime configuration populated from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub printer_address: String,
    pub print_width: u32,
    pub dither_threshold: u8,
    pub white_threshold: f32,
    pub unack_chunk_size: usize,
    pub feed_dots: u16,
    pub feed_lines: u16,
    pub write_timeout_ms: u64,
    pub scan_timeout_secs: u64,
    pub dry_run_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let transfer = TransferOptions::default();
        let pipeline = PipelineConfig::default();
        Self {
            printer_address: String::new(),
            print_width: pipeline.target_width,
            dither_threshold: pipeline.dither_threshold,
            white_threshold: pipeline.white_threshold,
            unack_chunk_size: transfer.unack_chunk_size,
            feed_dots: transfer.feed_dots,
            feed_lines: transfer.feed_lines,
            write_timeout_ms: transfer.write_timeout.as_millis() as u64,
            scan_timeout_secs: 10,
            dry_run_mode: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Result<Self, anyhow::Error> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, rejecting any invalid value.
    pub fn load_from<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let g = |key: &str| -> String { lookup(key).unwrap_or_default().trim().to_string() };

        let mut errors = Vec::new();
        for key in SETTING_KEYS {
            let value = g(key);
            if value.is_empty() {
                continue;
            }
            if let Err(e) = validate_setting(key, &value) {
                errors.push(format!("{key}: {e}"));
            }
        }
        if !errors.is_empty() {
            anyhow::bail!("Invalid settings: {}", errors.join(", "));
        }

        let d = Self::default();
        Ok(Self {
            printer_address: g("PRINTER_ADDRESS"),
            print_width: parse_or(&g("PRINT_WIDTH"), d.print_width),
            dither_threshold: parse_or(&g("DITHER_THRESHOLD"), d.dither_threshold),
            white_threshold: parse_or(&g("WHITE_THRESHOLD"), d.white_threshold),
            unack_chunk_size: parse_or(&g("UNACK_CHUNK_SIZE"), d.unack_chunk_size),
            feed_dots: parse_or(&g("FEED_DOTS"), d.feed_dots),
            feed_lines: parse_or(&g("FEED_LINES"), d.feed_lines),
            write_timeout_ms: parse_or(&g("WRITE_TIMEOUT_MS"), d.write_timeout_ms),
            scan_timeout_secs: parse_or(&g("SCAN_TIMEOUT_SECS"), d.scan_timeout_secs),
            dry_run_mode: g("DRY_RUN_MODE") == "true",
        })
    }

    /// Image pipeline settings for this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let base = PipelineConfig::new();
        let base = match PaperWidth::from_dots(self.print_width) {
            Some(paper) => base.with_paper(paper),
            None => base.with_target_width(self.print_width),
        };
        base.with_dither_threshold(self.dither_threshold)
            .with_white_threshold(self.white_threshold)
    }

    /// Transfer pacing and feed settings for this configuration.
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions::new()
            .with_unack_chunk_size(self.unack_chunk_size)
            .with_write_timeout(Duration::from_millis(self.write_timeout_ms))
            .with_feed_dots(self.feed_dots)
            .with_feed_lines(self.feed_lines)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(s: &str, default: T) -> T {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, anyhow::Error> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::load_from(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.print_width, 384);
        assert_eq!(config.dither_threshold, 112);
        assert_eq!(config.unack_chunk_size, 120);
        assert!(!config.dry_run_mode);
    }

    #[test]
    fn test_values_are_parsed() {
        let config = load(&[
            ("PRINTER_ADDRESS", "AA:BB:CC:DD:EE:FF"),
            ("PRINT_WIDTH", "576"),
            ("DITHER_THRESHOLD", "128"),
            ("FEED_LINES", "5"),
            ("WRITE_TIMEOUT_MS", "2000"),
            ("DRY_RUN_MODE", "true"),
        ])
        .unwrap();
        assert_eq!(config.printer_address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(config.print_width, 576);
        assert_eq!(config.dither_threshold, 128);
        assert_eq!(config.feed_lines, 5);
        assert!(config.dry_run_mode);

        let options = config.transfer_options();
        assert_eq!(options.write_timeout, Duration::from_secs(2));
        assert_eq!(options.feed_lines, 5);
        assert_eq!(config.pipeline_config().target_width, 576);
    }

    #[test]
    fn test_printer_name_is_accepted_as_target() {
        let config = load(&[("PRINTER_ADDRESS", "MTP-II")]).unwrap();
        assert_eq!(config.printer_address, "MTP-II");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = load(&[("PRINT_WIDTH", "500"), ("UNACK_CHUNK_SIZE", "0")]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("PRINT_WIDTH"));
        assert!(msg.contains("UNACK_CHUNK_SIZE"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("FEED_DOTS", "  "), ("PRINT_WIDTH", "")]).unwrap();
        assert_eq!(config.feed_dots, 0);
        assert_eq!(config.print_width, 384);
    }
}
