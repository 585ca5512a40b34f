//! Outbound request builders.
//!
//! Every builder returns a ready-to-encode [`Frame`]. Control requests ride
//! a common 18-byte envelope addressed by switch id and stamped with the
//! session's sequence number; the device-facing inner body is delimited by
//! `0x7E` and carries an additive checksum the firmware verifies.

use crate::error::{ProtoError, ProtoResult};
use crate::frame::{Frame, PacketType};

/// Subtype tags of the STATUS request/response envelope.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum StatusSubtype {
    /// Request full state of all mesh nodes under a switch.
    GetStatusPaginated = 0x52,
    /// Single-device status fragment (inbound only).
    GetStatus = 0xDB,
    /// On/off.
    SetStatus = 0xD0,
    /// Brightness only. Legacy: superseded by [`StatusSubtype::SetState`],
    /// recognized but never emitted.
    SetBrightness = 0xD2,
    /// White temperature only.
    SetColorTemp = 0xE2,
    /// Combined on/brightness/temperature/RGB. The preferred control frame.
    SetState = 0xF0,
}

const ENVELOPE_LEN: usize = 18;
const INNER_DELIMITER: u8 = 0x7E;

/// Inner body of a paginated status request, fixed by the firmware.
pub const GET_STATUS_PAGINATED_INNER: [u8; 6] = [0xFF, 0xFF, 0x00, 0x00, 0x56, 0x7E];

/// Login frame. The authorize token is a short opaque ASCII credential
/// obtained from the two-factor REST exchange.
pub fn auth(user_id: u32, authorize: &str) -> ProtoResult<Frame> {
    if !authorize.is_ascii() {
        return Err(ProtoError::AuthTokenNotAscii);
    }
    let auth_len =
        u8::try_from(authorize.len()).map_err(|_| ProtoError::AuthTokenTooLong(authorize.len()))?;

    let mut payload = Vec::with_capacity(authorize.len() + 10);
    payload.push(0x03);
    payload.extend_from_slice(&user_id.to_be_bytes());
    payload.push(0x00);
    payload.push(auth_len);
    payload.extend_from_slice(authorize.as_bytes());
    payload.extend_from_slice(&[0x00, 0x00, 0xB4]);

    Ok(Frame::request(PacketType::Auth, payload))
}

/// Empty keep-alive frame.
#[must_use]
pub fn ping() -> Frame {
    Frame::request(PacketType::Ping, vec![])
}

/// Reachability probe. The server answers only while the switch is online.
#[must_use]
pub fn connected_probe(switch_id: u32, seq: u16) -> Frame {
    Frame::request(PacketType::Connected, short_payload(switch_id, seq))
}

/// Ack for an unsolicited STATUS packet, echoing its response id.
#[must_use]
pub fn status_ack(switch_id: u32, response_id: u16) -> Frame {
    Frame::request(PacketType::Status, short_payload(switch_id, response_id))
}

/// Request the full mesh state under a switch.
#[must_use]
pub fn get_status_paginated(switch_id: u32, seq: u16) -> Frame {
    status_request(
        switch_id,
        seq,
        StatusSubtype::GetStatusPaginated,
        &GET_STATUS_PAGINATED_INNER,
    )
}

/// Combined state write: on/off, brightness, white temperature and RGB in
/// one atomic command.
#[must_use]
pub fn set_state(
    switch_id: u32,
    seq: u16,
    mesh_id: u16,
    on: bool,
    brightness: u8,
    color_temp: u8,
    rgb: [u8; 3],
) -> Frame {
    let mut inner = [0u8; 16];
    inner_header(&mut inner, mesh_id, StatusSubtype::SetState);
    inner[8] = u8::from(on);
    inner[9] = brightness;
    inner[10] = color_temp;
    inner[11] = rgb[0];
    inner[12] = rgb[1];
    inner[13] = rgb[2];
    inner[14] = set_state_checksum(mesh_id, on, brightness, color_temp, rgb);
    inner[15] = INNER_DELIMITER;

    status_request(switch_id, seq, StatusSubtype::SetState, &inner)
}

/// On/off only.
#[must_use]
pub fn set_status(switch_id: u32, seq: u16, mesh_id: u16, on: bool) -> Frame {
    let mut inner = [0u8; 13];
    inner_header(&mut inner, mesh_id, StatusSubtype::SetStatus);
    inner[8] = u8::from(on);
    inner[11] = set_status_checksum(mesh_id, on);
    inner[12] = INNER_DELIMITER;

    status_request(switch_id, seq, StatusSubtype::SetStatus, &inner)
}

/// White temperature only.
#[must_use]
pub fn set_color_temp(switch_id: u32, seq: u16, mesh_id: u16, color_temp: u8) -> Frame {
    let mut inner = [0u8; 12];
    inner_header(&mut inner, mesh_id, StatusSubtype::SetColorTemp);
    inner[8] = 0x05;
    inner[9] = color_temp;
    inner[10] = set_color_temp_checksum(mesh_id, color_temp);
    inner[11] = INNER_DELIMITER;

    status_request(switch_id, seq, StatusSubtype::SetColorTemp, &inner)
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn set_state_checksum(
    mesh_id: u16,
    on: bool,
    brightness: u8,
    color_temp: u8,
    rgb: [u8; 3],
) -> u8 {
    let sum = 496
        + u32::from(mesh_id)
        + u32::from(on)
        + u32::from(brightness)
        + u32::from(color_temp)
        + u32::from(rgb[0])
        + u32::from(rgb[1])
        + u32::from(rgb[2]);
    (sum % 256) as u8
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn set_status_checksum(mesh_id: u16, on: bool) -> u8 {
    ((429 + u32::from(mesh_id) + u32::from(on)) % 256) as u8
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn set_color_temp_checksum(mesh_id: u16, color_temp: u8) -> u8 {
    ((469 + u32::from(mesh_id) + u32::from(color_temp)) % 256) as u8
}

/// 7-byte payload shared by probes and acks: switch id, a 16-bit counter,
/// one pad byte.
fn short_payload(switch_id: u32, counter: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(7);
    payload.extend_from_slice(&switch_id.to_be_bytes());
    payload.extend_from_slice(&counter.to_be_bytes());
    payload.push(0x00);
    payload
}

/// Common prefix of every control inner: two pad bytes, the big-endian mesh
/// address, a pad byte, the subtype, two pad bytes.
fn inner_header(inner: &mut [u8], mesh_id: u16, subtype: StatusSubtype) {
    inner[2..4].copy_from_slice(&mesh_id.to_be_bytes());
    inner[5] = subtype as u8;
}

#[allow(clippy::cast_possible_truncation)]
fn status_request(switch_id: u32, seq: u16, subtype: StatusSubtype, inner: &[u8]) -> Frame {
    let mut payload = vec![0u8; ENVELOPE_LEN + inner.len()];
    payload[0..4].copy_from_slice(&switch_id.to_be_bytes());
    payload[4..6].copy_from_slice(&seq.to_be_bytes());
    payload[7] = 0x7E;
    payload[12] = 0xF8;
    payload[13] = subtype as u8;
    payload[14] = inner.len() as u8;
    payload[ENVELOPE_LEN..].copy_from_slice(inner);

    Frame::request(PacketType::Status, payload)
}
