//! Receipt printer CLI.
//!
//! ```bash
//! # List printers in range
//! receipt-printer scan
//!
//! # Run the image pipeline only and save the result
//! receipt-printer preview photo.jpg -o preview.png
//!
//! # Print an image
//! receipt-printer print --address AA:BB:CC:DD:EE:FF photo.jpg
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use receipt_printer_lib::config::validation::validate_setting;
use receipt_printer_lib::services::printer;
use receipt_printer_lib::{AppConfig, init_foundation};
use thermal_printer::PrinterError;

/// Receipt printer - print images on a BLE thermal printer
#[derive(Parser, Debug)]
#[command(name = "receipt-printer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print width in dots (384 for 58mm, 576 for 80mm)
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Dither threshold (0-255)
    #[arg(long, global = true)]
    threshold: Option<u8>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List printers advertising the receipt printer service
    Scan {
        /// Scan duration in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the image pipeline and save the bitmap as PNG
    Preview {
        /// Input image (PNG, JPEG, ...)
        input: PathBuf,

        /// Output PNG file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Print an image
    Print {
        /// Input image (PNG, JPEG, ...)
        input: PathBuf,

        /// Printer address or name (defaults to PRINTER_ADDRESS, or the first printer found)
        #[arg(long)]
        address: Option<String>,

        /// Prepare the job without connecting
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = init_foundation()?;
    apply_overrides(&mut config, &cli)?;

    match cli.command {
        Commands::Scan { timeout, json } => {
            if let Some(secs) = timeout {
                check("SCAN_TIMEOUT_SECS", &secs.to_string())?;
                config.scan_timeout_secs = secs;
            }
            let printers = printer::scan_printers(&config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&printers)?);
            } else if printers.is_empty() {
                println!("No printers found");
            } else {
                for p in &printers {
                    println!("{}  {}  {}", p.id, p.name, p.last_seen.format("%H:%M:%S"));
                }
            }
        }
        Commands::Preview { input, output } => {
            let bytes = read_input(&input)?;
            let summary = printer::export_preview(&bytes, &config.pipeline_config(), &output)?;
            println!(
                "Wrote {}x{} preview to {}",
                summary.width,
                summary.height,
                output.display()
            );
        }
        Commands::Print {
            input,
            address,
            dry_run,
        } => {
            if let Some(address) = address {
                check("PRINTER_ADDRESS", &address)?;
                config.printer_address = address;
            }
            config.dry_run_mode |= dry_run;

            let bytes = read_input(&input)?;
            match printer::print_image(&config, &bytes).await {
                Ok(summary) if summary.dry_run => {
                    println!(
                        "Dry-run: {}x{} bitmap, {} bytes packed",
                        summary.width, summary.height, summary.packed_bytes
                    );
                }
                Ok(summary) => {
                    println!(
                        "Printed {}x{} in {} chunks{}",
                        summary.width,
                        summary.height,
                        summary.chunks,
                        if summary.downgraded {
                            " (fell back to acknowledged writes)"
                        } else {
                            ""
                        }
                    );
                }
                Err(e) => {
                    if let Some(err) = e.downcast_ref::<PrinterError>() {
                        if err.is_quiet_cancellation() {
                            tracing::warn!("{err}");
                            return Ok(());
                        }
                    }
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}

/// Apply global command-line overrides on top of environment settings.
fn apply_overrides(config: &mut AppConfig, cli: &Cli) -> anyhow::Result<()> {
    if let Some(width) = cli.width {
        check("PRINT_WIDTH", &width.to_string())?;
        config.print_width = width;
    }
    if let Some(threshold) = cli.threshold {
        config.dither_threshold = threshold;
    }
    Ok(())
}

fn check(key: &str, value: &str) -> anyhow::Result<()> {
    validate_setting(key, value).map_err(|e| anyhow::anyhow!("{key}: {e}"))
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
