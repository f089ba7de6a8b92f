//! Print service.
//!
//! Runs encoded image bytes through the image pipeline and sends the packed
//! raster command to a BLE receipt printer.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local};
use image_processor::{
    PackedCommand, PipelineConfig, PrintableBitmap, decode_raster, encode_png, pack_bitmap,
    prepare_for_print,
};
use serde::Serialize;
use thermal_printer::{
    BleConnection, EscPosProtocol, PrinterError, PrinterProtocol, TransferCoordinator,
    TransferReport,
};

use crate::config::AppConfig;

/// Settle time between connecting and the first write.
const CONNECT_SETTLE: Duration = Duration::from_millis(500);

/// A printer seen during a scan.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredPrinter {
    pub name: String,
    pub id: String,
    pub last_seen: DateTime<Local>,
}

/// Outcome of one print request.
#[derive(Debug, Clone, Serialize)]
pub struct PrintSummary {
    pub width: u32,
    pub height: u32,
    pub packed_bytes: usize,
    pub dry_run: bool,
    pub chunks: usize,
    pub writes: usize,
    pub downgraded: bool,
    pub printed_at: DateTime<Local>,
}

/// A bitmap ready to send, with its packed command.
#[derive(Debug)]
pub struct PreparedJob {
    pub bitmap: PrintableBitmap,
    pub command: PackedCommand,
}

/// Decode, prepare and pack an encoded image.
pub fn prepare_job(bytes: &[u8], config: &PipelineConfig) -> anyhow::Result<PreparedJob> {
    let raster = decode_raster(bytes).context("Failed to decode image")?;
    let bitmap = prepare_for_print(raster, config).context("Failed to prepare bitmap")?;
    let command = pack_bitmap(&bitmap, config.dither_threshold).context("Failed to pack bitmap")?;
    Ok(PreparedJob { bitmap, command })
}

/// Run the pipeline only and write the result as PNG to `output`.
pub fn export_preview(
    bytes: &[u8],
    config: &PipelineConfig,
    output: &Path,
) -> anyhow::Result<PrintSummary> {
    let job = prepare_job(bytes, config)?;
    let png = encode_png(&job.bitmap).context("Failed to encode preview")?;
    std::fs::write(output, png)
        .with_context(|| format!("Failed to write preview to {}", output.display()))?;
    tracing::info!(path = %output.display(), "Preview written");
    Ok(summary(&job, true, &TransferReport::default()))
}

/// Scan for printers advertising the receipt printer service.
pub async fn scan_printers(config: &AppConfig) -> anyhow::Result<Vec<DiscoveredPrinter>> {
    let protocol = EscPosProtocol::new();
    let conn = BleConnection::new()
        .await
        .context("Failed to initialize BLE")?
        .with_scan_timeout(config.scan_timeout());
    let devices = conn.scan_devices(protocol.service_uuid()).await?;
    Ok(devices
        .into_iter()
        .map(|d| DiscoveredPrinter {
            name: d.name,
            id: d.id,
            last_seen: Local::now(),
        })
        .collect())
}

/// Print an encoded image on the configured printer.
///
/// In dry-run mode the job is prepared and packed but nothing is sent.
pub async fn print_image(config: &AppConfig, bytes: &[u8]) -> anyhow::Result<PrintSummary> {
    let job = prepare_job(bytes, &config.pipeline_config())?;

    if config.dry_run_mode {
        tracing::info!(
            width = job.bitmap.width(),
            height = job.bitmap.height(),
            packed_bytes = job.command.len(),
            "Dry-run: skipping transfer"
        );
        return Ok(summary(&job, true, &TransferReport::default()));
    }

    let protocol = EscPosProtocol::new();
    let conn = BleConnection::new()
        .await
        .context("Failed to initialize BLE")?
        .with_scan_timeout(config.scan_timeout());
    let mut session = conn
        .connect_target(&config.printer_address, &protocol)
        .await?;
    tokio::time::sleep(CONNECT_SETTLE).await;

    let mut coordinator = TransferCoordinator::new(protocol, config.transfer_options());
    let send_result = coordinator.transfer(&mut session, Some(&job.command)).await;
    let disconnect_result = conn.disconnect(&mut session).await;
    let report = finalize_results(send_result, disconnect_result)?;

    Ok(summary(&job, false, &report))
}

fn summary(job: &PreparedJob, dry_run: bool, report: &TransferReport) -> PrintSummary {
    PrintSummary {
        width: job.bitmap.width(),
        height: job.bitmap.height(),
        packed_bytes: job.command.len(),
        dry_run,
        chunks: report.bitmap_chunks,
        writes: report.writes,
        downgraded: report.downgraded,
        printed_at: Local::now(),
    }
}

/// Combine the transfer and disconnect outcomes, preferring the transfer error.
fn finalize_results(
    send_result: Result<TransferReport, PrinterError>,
    disconnect_result: Result<(), PrinterError>,
) -> anyhow::Result<TransferReport> {
    match (send_result, disconnect_result) {
        (Ok(report), Ok(())) => Ok(report),
        (Err(send_err), Ok(())) => Err(send_err.into()),
        (Ok(_), Err(disconnect_err)) => {
            Err(anyhow::Error::new(disconnect_err).context("Printed, but disconnect failed"))
        }
        (Err(send_err), Err(disconnect_err)) => Err(anyhow::Error::new(send_err)
            .context(format!("Transfer failed; disconnect also failed: {disconnect_err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_processor::RasterBuffer;
    use image_processor::raster::{BLACK, WHITE};

    fn encoded_dot_png() -> Vec<u8> {
        let mut raster = RasterBuffer::from_pixel(104, 50, WHITE);
        raster.put_pixel(50, 25, BLACK);
        let bitmap = PrintableBitmap::try_from_raster(raster).unwrap();
        encode_png(&bitmap).unwrap()
    }

    #[test]
    fn test_prepare_job_packs_full_width() {
        let job = prepare_job(&encoded_dot_png(), &PipelineConfig::default()).unwrap();
        assert_eq!(job.bitmap.width(), 384);
        assert_eq!(job.command.bytes_per_row(), 48);
        assert_eq!(job.command.len(), 8 + 48 * job.bitmap.height() as usize);
    }

    #[test]
    fn test_prepare_job_rejects_garbage() {
        let err = prepare_job(b"not an image", &PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("decode"));
    }

    #[test]
    fn test_unaligned_print_width_is_an_error() {
        let config = AppConfig {
            print_width: 100,
            ..AppConfig::default()
        };
        let err = prepare_job(&encoded_dot_png(), &config.pipeline_config()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<image_processor::ImageError>(),
            Some(image_processor::ImageError::UnalignedWidth(100))
        ));
    }

    #[tokio::test]
    async fn test_dry_run_skips_transfer() {
        let config = AppConfig {
            dry_run_mode: true,
            ..AppConfig::default()
        };
        let summary = print_image(&config, &encoded_dot_png()).await.unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.writes, 0);
        assert_eq!(summary.width, 384);
    }

    #[test]
    fn test_export_preview_writes_png() {
        let path = std::env::temp_dir().join(format!("receipt-preview-{}.png", std::process::id()));
        let summary =
            export_preview(&encoded_dot_png(), &PipelineConfig::default(), &path).unwrap();
        let written = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(written.starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(summary.width, 384);
    }

    #[test]
    fn test_finalize_results_prefers_send_error() {
        let err = finalize_results(Err(PrinterError::DisconnectedMidTransfer), Ok(())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PrinterError>(),
            Some(PrinterError::DisconnectedMidTransfer)
        ));
    }

    #[test]
    fn test_finalize_results_returns_disconnect_error() {
        let err = finalize_results(
            Ok(TransferReport::default()),
            Err(PrinterError::BleConnection("gone".into())),
        )
        .unwrap_err();
        assert!(err.to_string().contains("disconnect failed"));
    }

    #[test]
    fn test_finalize_results_reports_both_errors() {
        let err = finalize_results(
            Err(PrinterError::LinkTimeout(5000)),
            Err(PrinterError::BleConnection("gone".into())),
        )
        .unwrap_err();
        assert!(err.to_string().contains("disconnect also failed"));
        assert!(matches!(
            err.downcast_ref::<PrinterError>(),
            Some(PrinterError::LinkTimeout(5000))
        ));
    }
}
