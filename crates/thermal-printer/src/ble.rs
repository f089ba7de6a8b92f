//! BLE discovery and connection management using btleplug.
//!
//! Provides scanning, connecting and disconnecting, and the [`BleLink`]
//! that carries print data to the printer's write characteristic.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::link::{PrinterLink, WriteMode};
use crate::protocol::PrinterProtocol;
use crate::session::{ConnectionSession, DisconnectHandle};
use crate::{PrinterError, Result};

/// Default BLE scan timeout in seconds.
const SCAN_TIMEOUT_SECS: u64 = 10;

/// Error text CoreBluetooth reports while the adapter is not usable yet.
const CENTRAL_INVALID_STATE: &str = "central manager has invalid state";

/// How adapter bring-up is retried while Bluetooth is still powering on.
///
/// Right after launch CoreBluetooth reports an invalid central state
/// (`have=0`) for a short while; only that error is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitRetry {
    /// Total attempts, the first one included.
    pub attempts: usize,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for InitRetry {
    fn default() -> Self {
        Self {
            attempts: 6,
            delay: Duration::from_millis(500),
        }
    }
}

/// Discovered BLE device information.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Device display name (may be empty if not advertised).
    pub name: String,
    /// Platform-specific device identifier (address on Linux, UUID on macOS).
    pub id: String,
    /// The underlying btleplug peripheral handle.
    pub peripheral: Peripheral,
}

/// Write characteristic of a connected printer.
///
/// Dropping the link stops its disconnect watcher.
#[derive(Debug)]
pub struct BleLink {
    peripheral: Peripheral,
    characteristic: Characteristic,
    watcher: JoinHandle<()>,
}

impl Drop for BleLink {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

impl BleLink {
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }
}

impl PrinterLink for BleLink {
    fn supports_write_without_response(&self) -> bool {
        self.characteristic
            .properties
            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE)
    }

    async fn write(&self, data: &[u8], mode: WriteMode) -> Result<()> {
        let write_type = match mode {
            WriteMode::WithResponse => WriteType::WithResponse,
            WriteMode::WithoutResponse => WriteType::WithoutResponse,
        };
        self.peripheral
            .write(&self.characteristic, data, write_type)
            .await
            .map_err(|e| PrinterError::LinkWriteFailed(e.to_string()))
    }
}

/// Owns the BLE adapter used to find and connect printers.
pub struct BleConnection {
    adapter: Adapter,
    scan_timeout: Duration,
}

impl BleConnection {
    /// Create a new BLE connection manager with the default [`InitRetry`].
    ///
    /// Initializes the platform BLE adapter (first available).
    pub async fn new() -> Result<Self> {
        Self::with_init_retries(InitRetry::default()).await
    }

    /// Create a BLE connection manager, retrying adapter bring-up per `retry`.
    pub async fn with_init_retries(retry: InitRetry) -> Result<Self> {
        let adapter = init_with_retry(retry, init_adapter).await?;
        Ok(Self {
            adapter,
            scan_timeout: Duration::from_secs(SCAN_TIMEOUT_SECS),
        })
    }

    /// Set how long a scan listens for advertisements.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Scan for BLE devices advertising the given service UUID.
    ///
    /// Returns the devices discovered within the scan window.
    pub async fn scan_devices(&self, service_uuid: Uuid) -> Result<Vec<DiscoveredDevice>> {
        tracing::info!(
            timeout_secs = self.scan_timeout.as_secs(),
            %service_uuid,
            "Starting BLE scan"
        );

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| PrinterError::BleScan(e.to_string()))?;

        // Listen for discovery events with timeout
        let mut events = self
            .adapter
            .events()
            .await
            .map_err(|e| PrinterError::BleScan(e.to_string()))?;

        let deadline = tokio::time::sleep(self.scan_timeout);
        tokio::pin!(deadline);

        let mut found = Vec::new();
        let mut seen_ids = HashSet::new();

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = events.next() => {
                    let Some(event) = event else { break };
                    let CentralEvent::DeviceDiscovered(id) = event else { continue };
                    let id_str = id.to_string();
                    if seen_ids.contains(&id_str) {
                        continue;
                    }
                    let Ok(peripheral) = self.adapter.peripheral(&id).await else { continue };
                    let Ok(Some(props)) = peripheral.properties().await else { continue };
                    if !props.services.contains(&service_uuid) {
                        continue;
                    }

                    let name = props.local_name.unwrap_or_default();
                    tracing::info!(name = %name, id = %id_str, "Found printer");
                    seen_ids.insert(id_str.clone());
                    found.push(DiscoveredDevice {
                        name,
                        id: id_str,
                        peripheral,
                    });
                }
            }
        }

        self.adapter
            .stop_scan()
            .await
            .map_err(|e| PrinterError::BleScan(e.to_string()))?;

        tracing::info!(count = found.len(), "BLE scan complete");
        Ok(found)
    }

    /// Scan for `target` (address or name) and connect to it.
    ///
    /// An empty target picks the first printer found. Fails with
    /// `DeviceNotFound` when nothing matches.
    pub async fn connect_target<P: PrinterProtocol>(
        &self,
        target: &str,
        protocol: &P,
    ) -> Result<ConnectionSession<BleLink>> {
        let devices = self.scan_devices(protocol.service_uuid()).await?;
        let device = find_target_device(devices, target)
            .ok_or_else(|| PrinterError::DeviceNotFound(target.to_string()))?;
        self.connect(&device, protocol.write_characteristic()).await
    }

    /// Connect to a specific peripheral and discover its write characteristic.
    ///
    /// Adapter events are subscribed before connecting, so a drop at any
    /// point after the link comes up flags the returned session.
    pub async fn connect(
        &self,
        device: &DiscoveredDevice,
        write_uuid: Uuid,
    ) -> Result<ConnectionSession<BleLink>> {
        tracing::info!(id = %device.id, name = %device.name, "Connecting to device");

        let events = self
            .adapter
            .events()
            .await
            .map_err(|e| PrinterError::BleConnection(e.to_string()))?;

        device
            .peripheral
            .connect()
            .await
            .map_err(|e| PrinterError::BleConnection(e.to_string()))?;

        device
            .peripheral
            .discover_services()
            .await
            .map_err(|e| PrinterError::BleConnection(e.to_string()))?;

        let characteristic = device
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == write_uuid)
            .ok_or(PrinterError::MissingCharacteristic)?;

        let handle = DisconnectHandle::default();
        let id = device.peripheral.id();
        let watcher = {
            let handle = handle.clone();
            tokio::spawn(async move {
                let mut events = events;
                while let Some(event) = events.next().await {
                    if is_disconnect_of(&event, &id) {
                        tracing::warn!(id = %id, "Printer disconnected");
                        handle.mark_disconnected();
                        break;
                    }
                }
            })
        };

        let session = ConnectionSession::watched(
            BleLink {
                peripheral: device.peripheral.clone(),
                characteristic,
                watcher,
            },
            handle,
        );

        tracing::info!(
            can_write_without_ack = session.can_write_without_ack(),
            "Connected and discovered characteristic"
        );
        Ok(session)
    }

    /// Disconnect the session's peripheral, if it still has one.
    ///
    /// Works on a session invalidated by a failed transfer as well.
    pub async fn disconnect(&self, session: &mut ConnectionSession<BleLink>) -> Result<()> {
        if let Some(link) = session.take_link() {
            tracing::info!("Disconnecting BLE device");
            link.peripheral
                .disconnect()
                .await
                .map_err(|e| PrinterError::BleConnection(e.to_string()))?;
        }
        Ok(())
    }
}

fn is_disconnect_of(event: &CentralEvent, id: &PeripheralId) -> bool {
    matches!(event, CentralEvent::DeviceDisconnected(gone) if gone == id)
}

/// Run `init` until it succeeds, retrying only while the adapter is powering on.
async fn init_with_retry<T, F, Fut>(retry: InitRetry, mut init: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match init().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && adapter_powering_on(&err) => {
                tracing::debug!(attempt, attempts, "BLE adapter not ready, retrying");
                attempt += 1;
                tokio::time::sleep(retry.delay).await;
            }
            Err(err) => return Err(with_permission_hint(err)),
        }
    }
}

/// CoreBluetooth has not reported a powered-on adapter yet (`have=0`).
fn adapter_powering_on(err: &PrinterError) -> bool {
    match err {
        PrinterError::BleConnection(msg) => {
            let msg = msg.to_ascii_lowercase();
            msg.contains(CENTRAL_INVALID_STATE) && msg.contains("have=0")
        }
        _ => false,
    }
}

/// Point the user at the Bluetooth permission when the adapter never came up.
fn with_permission_hint(err: PrinterError) -> PrinterError {
    match err {
        PrinterError::BleConnection(msg)
            if msg.to_ascii_lowercase().contains(CENTRAL_INVALID_STATE) =>
        {
            PrinterError::BleConnection(format!(
                "{msg} (turn Bluetooth on and allow this app under System Settings > Privacy & Security > Bluetooth)"
            ))
        }
        other => other,
    }
}

async fn init_adapter() -> Result<Adapter> {
    let manager = Manager::new()
        .await
        .map_err(|e| PrinterError::BleConnection(e.to_string()))?;

    let adapters = manager
        .adapters()
        .await
        .map_err(|e| PrinterError::BleConnection(e.to_string()))?;

    adapters
        .into_iter()
        .next()
        .ok_or_else(|| PrinterError::BleConnection("No BLE adapter found".into()))
}

/// Pick the device matching `target` by id or name; empty picks the first.
pub fn find_target_device(
    devices: Vec<DiscoveredDevice>,
    target: &str,
) -> Option<DiscoveredDevice> {
    let target = target.trim();
    if target.is_empty() {
        return devices.into_iter().next();
    }
    devices
        .into_iter()
        .find(|device| device_matches_target(&device.id, &device.name, target))
}

/// Compare a device against a configured address or name.
///
/// Addresses match case-insensitively and ignoring separators.
pub fn device_matches_target(id: &str, name: &str, target: &str) -> bool {
    id.eq_ignore_ascii_case(target)
        || normalize_device_id(id) == normalize_device_id(target)
        || (!name.is_empty() && name.eq_ignore_ascii_case(target))
}

fn normalize_device_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
