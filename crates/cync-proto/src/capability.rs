//! Capability tables keyed on the inventory's `deviceType`.
//!
//! The cloud does not advertise per-device features; the device type byte
//! selects them. A bulb exposes exactly the characteristics whose table
//! contains its type.

#[must_use]
pub const fn supports_brightness(device_type: u8) -> bool {
    matches!(
        device_type,
        1 | 5..=11
            | 13..=15
            | 17..=37
            | 48
            | 49
            | 55
            | 56
            | 80..=83
            | 85
            | 128..=154
            | 156
            | 158..=165
    )
}

#[must_use]
pub const fn supports_color_temp(device_type: u8) -> bool {
    matches!(
        device_type,
        5..=8
            | 10
            | 11
            | 14
            | 15
            | 19..=23
            | 25
            | 26
            | 28..=35
            | 80
            | 82
            | 83
            | 85
            | 129..=133
            | 135..=147
            | 153
            | 154
            | 156
            | 158..=165
    )
}

#[must_use]
pub const fn supports_rgb(device_type: u8) -> bool {
    matches!(
        device_type,
        6..=8
            | 21..=23
            | 30..=35
            | 131..=133
            | 137..=143
            | 146
            | 147
            | 153
            | 154
            | 156
            | 158..=165
    )
}

/// The characteristics a single device exposes. On/off is universal.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Capabilities {
    pub on_off: bool,
    pub brightness: bool,
    pub color_temp: bool,
    pub rgb: bool,
}

impl Capabilities {
    #[must_use]
    pub const fn for_device_type(device_type: u8) -> Self {
        Self {
            on_off: true,
            brightness: supports_brightness(device_type),
            color_temp: supports_color_temp(device_type),
            rgb: supports_rgb(device_type),
        }
    }
}
