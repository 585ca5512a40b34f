//! Color conversions between the wire formats and the host's view space.
//!
//! The cloud speaks a 0..=100 white temperature (0 = warm) and raw RGB
//! bytes. The host speaks mired-like color temperature (140..=500) and
//! hue/saturation. Hue and saturation are an HSV projection of the RGB
//! channel, with the bulb's brightness standing in for V.

/// Wire white temperature to the host's mired-like view space (140..=500).
#[must_use]
pub fn mired_from_wire(wire_temp: u8) -> u16 {
    let wire_temp = u16::from(wire_temp.min(100));
    ((100 - wire_temp) * 360 + 50) / 100 + 140
}

/// Host mired value back to the 0..=100 wire space. Out-of-range input is
/// clamped to the representable band.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn mired_to_wire(mired: u16) -> u8 {
    let mired = u32::from(mired.clamp(140, 500));
    (100 - ((mired - 140) * 100 + 180) / 360) as u8
}

/// Hue (0..360) and saturation (0..=100) of an RGB triple. Black projects
/// to hue 0, saturation 0.
#[must_use]
pub fn hs_from_rgb(rgb: [u8; 3]) -> (f64, f64) {
    let [r, g, b] = rgb.map(f64::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    if max <= 0.0 || delta <= 0.0 {
        return (0.0, 0.0);
    }

    let hue = if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let hue = if hue < 0.0 { hue + 360.0 } else { hue };
    let sat = delta / max * 100.0;

    (hue, sat)
}

/// RGB triple for a hue (0..360), saturation (0..=100) and value (0..=100).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb_from_hsv(hue: f64, sat: f64, value: u8) -> [u8; 3] {
    let hue = hue.rem_euclid(360.0);
    let sat = (sat / 100.0).clamp(0.0, 1.0);
    let val = (f64::from(value.min(100))) / 100.0;

    let chroma = val * sat;
    let x = chroma * (1.0 - ((hue / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = val - chroma;

    let (r, g, b) = match hue {
        h if h < 60.0 => (chroma, x, 0.0),
        h if h < 120.0 => (x, chroma, 0.0),
        h if h < 180.0 => (0.0, chroma, x),
        h if h < 240.0 => (0.0, x, chroma),
        h if h < 300.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    [r, g, b].map(|q| ((q + m) * 255.0).round().clamp(0.0, 255.0) as u8)
}
