use crate::config::AppConfig;

/// Load `.env` and build the validated configuration (fatal on error).
pub fn init_foundation() -> Result<AppConfig, anyhow::Error> {
    load_dotenv();
    let config = AppConfig::load()?;
    tracing::info!(
        address = %config.printer_address,
        width = config.print_width,
        dry_run = config.dry_run_mode,
        "Settings loaded"
    );
    Ok(config)
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}
