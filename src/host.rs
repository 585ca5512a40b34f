//! The boundary to the home-automation host.
//!
//! The host adapter owns accessory bookkeeping and user interaction; the
//! core only needs the capabilities below. Inventory imports and user
//! intents enter the core through [`BackendRequest`]s on the registry's
//! broadcast channel, so all state mutation stays on the backend loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cync_proto::capability::Capabilities;

/// Errors crossing the host boundary are opaque to the core: they are
/// logged and never interrupt the session loop.
pub type HostResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// One inventory row, as flattened from the REST device-property call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulbRecord {
    pub device_id: u32,
    pub switch_id: u32,
    pub device_type: u8,
    pub display_name: String,
    pub home_id: u32,
}

/// State pushed to the host after an apply. Only characteristics the
/// device supports are populated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub on: Option<bool>,
    pub brightness: Option<u8>,
    /// View-space color temperature (mired-like, 140..=500).
    pub color_temp: Option<u16>,
    pub hue: Option<f64>,
    pub saturation: Option<f64>,
}

/// User commands the host adapter forwards into the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UserIntent {
    SetOn(bool),
    SetBrightness(u8),
    /// View-space mireds.
    SetColorTemp(u16),
    /// Degrees, 0..360.
    SetHue(f64),
    /// Percent, 0..=100.
    SetSaturation(f64),
}

impl UserIntent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetOn(_) => "on/off",
            Self::SetBrightness(_) => "brightness",
            Self::SetColorTemp(_) => "color temperature",
            Self::SetHue(_) => "hue",
            Self::SetSaturation(_) => "saturation",
        }
    }
}

/// Requests entering the core from the host side.
#[derive(Clone, Debug)]
pub enum BackendRequest {
    /// Upsert the known device population after a REST inventory pass.
    ImportInventory(Vec<BulbRecord>),
    /// A user command for the device with this `deviceID`.
    Intent(u32, UserIntent),
    /// The host removed the accessory; forget the device.
    RemoveAccessory(u32),
}

#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Called once per device when it first appears in the inventory.
    async fn expose_capabilities(&self, device_id: u32, caps: Capabilities) -> HostResult;

    /// Called after every state apply.
    async fn notify_state(&self, device_id: u32, update: StateUpdate) -> HostResult;
}

/// Stable accessory UUID for a device, shared with host-side caches.
#[must_use]
pub fn accessory_uuid(device_id: u32) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, device_id.to_string().as_bytes())
}

/// Minimal adapter that logs everything it is told. Keeps the binary
/// operable for protocol debugging without a real host attached.
pub struct LoggingHost;

#[async_trait]
impl HostBridge for LoggingHost {
    async fn expose_capabilities(&self, device_id: u32, caps: Capabilities) -> HostResult {
        log::info!("[host] Device {device_id} ({}) exposes {caps:?}", accessory_uuid(device_id));
        Ok(())
    }

    async fn notify_state(&self, device_id: u32, update: StateUpdate) -> HostResult {
        log::info!("[host] Device {device_id} now {update:?}");
        Ok(())
    }
}
