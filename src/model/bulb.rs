use cync_proto::capability::Capabilities;
use cync_proto::color;
use cync_proto::frame::Frame;
use cync_proto::packet::StatusUpdate;
use cync_proto::request;

use crate::error::{ApiError, ApiResult};
use crate::host::{BulbRecord, StateUpdate, UserIntent};

/// One Cync device. The cloud's state is authoritative: user intents
/// update this record optimistically, and every inbound status overwrites
/// it without echo suppression.
#[derive(Clone, Debug)]
pub struct Bulb {
    pub device_id: u32,
    pub switch_id: u32,
    pub mesh_id: u16,
    pub device_type: u8,
    pub display_name: String,
    /// Confirmed reachable by the most recent probe cycle.
    pub connected: bool,

    on: bool,
    brightness: u8,
    /// Wire space, 0 (warm) ..= 100 (cool).
    color_temp: u8,
    rgb: [u8; 3],
}

impl Bulb {
    #[must_use]
    pub fn new(record: &BulbRecord, mesh_id: u16) -> Self {
        Self {
            device_id: record.device_id,
            switch_id: record.switch_id,
            mesh_id,
            device_type: record.device_type,
            display_name: record.display_name.clone(),
            connected: false,
            on: false,
            brightness: 0,
            color_temp: 0,
            rgb: [0, 0, 0],
        }
    }

    /// A later inventory pass refreshes attributes in place; runtime state
    /// is kept.
    pub fn refresh_inventory(&mut self, record: &BulbRecord, mesh_id: u16) {
        self.device_id = record.device_id;
        self.mesh_id = mesh_id;
        self.device_type = record.device_type;
        self.display_name.clone_from(&record.display_name);
    }

    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        Capabilities::for_device_type(self.device_type)
    }

    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.on
    }

    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Apply a user intent to the in-memory state. The caller emits the
    /// resulting SET_STATE; a capability the device lacks is rejected
    /// here and nothing is sent.
    pub fn apply_intent(&mut self, intent: &UserIntent) -> ApiResult<()> {
        let caps = self.capabilities();
        let device_id = self.device_id;
        let reject = move || ApiError::UnsupportedIntent(device_id, intent.name());

        match *intent {
            UserIntent::SetOn(on) => self.on = on,
            UserIntent::SetBrightness(brightness) => {
                if !caps.brightness {
                    return Err(reject());
                }
                self.brightness = brightness.min(100);
            }
            UserIntent::SetColorTemp(mired) => {
                if !caps.color_temp {
                    return Err(reject());
                }
                self.color_temp = color::mired_to_wire(mired);
            }
            UserIntent::SetHue(hue) => {
                if !caps.rgb {
                    return Err(reject());
                }
                let (_, sat) = color::hs_from_rgb(self.rgb);
                self.rgb = color::rgb_from_hsv(hue, sat, self.brightness);
            }
            UserIntent::SetSaturation(sat) => {
                if !caps.rgb {
                    return Err(reject());
                }
                let (hue, _) = color::hs_from_rgb(self.rgb);
                self.rgb = color::rgb_from_hsv(hue, sat, self.brightness);
            }
        }

        Ok(())
    }

    /// The control frame carrying the full current state.
    #[must_use]
    pub fn set_state_request(&self, seq: u16) -> Frame {
        request::set_state(
            self.switch_id,
            seq,
            self.mesh_id,
            self.on,
            self.brightness,
            self.color_temp,
            self.rgb,
        )
    }

    /// Overwrite state from an inbound status record and produce the host
    /// notification for it. Idempotent by construction.
    pub fn apply(&mut self, update: &StatusUpdate) -> StateUpdate {
        self.on = update.on;
        self.brightness = update.brightness.min(100);
        if let Some(temp) = update.color_temp {
            self.color_temp = temp.min(100);
        }
        // a colorless device never stores a color, so its control frames
        // stay white no matter what the mesh record carried
        if self.capabilities().rgb {
            if let Some(rgb) = update.rgb {
                self.rgb = rgb;
            }
        }

        self.notification()
    }

    /// Current state projected onto the characteristics this device
    /// actually exposes.
    #[must_use]
    pub fn notification(&self) -> StateUpdate {
        let caps = self.capabilities();
        let (hue, saturation) = color::hs_from_rgb(self.rgb);

        StateUpdate {
            on: Some(self.on),
            brightness: caps.brightness.then_some(self.brightness),
            color_temp: caps.color_temp.then(|| color::mired_from_wire(self.color_temp)),
            hue: caps.rgb.then_some(hue),
            saturation: caps.rgb.then_some(saturation),
        }
    }
}
