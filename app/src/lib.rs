//! Receipt printer application: configuration, bootstrap and the print
//! service that drives the image pipeline and the BLE transfer.

pub mod bootstrap;
pub mod config;
pub mod services;

pub use bootstrap::init_foundation;
pub use config::AppConfig;
