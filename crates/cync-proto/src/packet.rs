//! Decoded inbound packets.
//!
//! The outer [`crate::frame`] layer hands over a packet type and payload;
//! this module gives the payload meaning. Parsers here are total: a record
//! that does not fit its frame is dropped, never an error that would tear
//! down the session.

use byteorder::{BigEndian as BE, ByteOrder};

use crate::error::{ProtoError, ProtoResult};
use crate::frame::{Frame, PacketType};

/// One device state observation, as carried by any of the four inbound
/// status shapes. Fields a shape does not carry stay `None` and leave the
/// bulb's corresponding state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub mesh_id: u16,
    pub on: bool,
    pub brightness: u8,
    pub color_temp: Option<u8>,
    pub rgb: Option<[u8; 3]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    pub switch_id: u32,
    pub response_id: u16,
    pub is_response: bool,
    pub body: StatusBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusBody {
    /// 0xDB: single-device status fragment.
    Device(StatusUpdate),
    /// 0x52: full mesh state, one record per node under the switch.
    Paginated(Vec<StatusUpdate>),
    /// Subtype the bridge does not consume, or a frame too short to carry
    /// one. Still acked when unsolicited.
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    AuthReply {
        success: bool,
    },
    Sync {
        switch_id: u32,
        updates: Vec<StatusUpdate>,
    },
    Status(StatusPacket),
    StatusSync {
        switch_id: u32,
        update: Option<StatusUpdate>,
    },
    Connected {
        switch_id: u32,
    },
    Ping,
}

impl Packet {
    pub fn decode(frame: &Frame) -> ProtoResult<Self> {
        let data = frame.payload.as_slice();
        match frame.packet_type {
            PacketType::Auth => auth_reply(data),
            PacketType::Sync => sync(data),
            PacketType::Status => status(data, frame.is_response),
            PacketType::StatusSync => status_sync(data),
            PacketType::Connected => connected(data),
            PacketType::Ping => Ok(Self::Ping),
        }
    }
}

fn need(data: &[u8], needed: usize, what: &'static str) -> ProtoResult<()> {
    if data.len() < needed {
        return Err(ProtoError::Truncated {
            what,
            needed,
            actual: data.len(),
        });
    }
    Ok(())
}

fn auth_reply(data: &[u8]) -> ProtoResult<Packet> {
    need(data, 2, "auth reply")?;
    Ok(Packet::AuthReply {
        success: data[0] == 0 && data[1] == 0,
    })
}

fn connected(data: &[u8]) -> ProtoResult<Packet> {
    need(data, 4, "connected reply")?;
    Ok(Packet::Connected {
        switch_id: BE::read_u32(&data[0..4]),
    })
}

fn status(data: &[u8], is_response: bool) -> ProtoResult<Packet> {
    need(data, 6, "status header")?;
    let switch_id = BE::read_u32(&data[0..4]);
    let response_id = BE::read_u16(&data[4..6]);

    let body = if data.len() >= 25 {
        match data[13] {
            0xDB => device_fragment(data).map_or(StatusBody::Opaque, StatusBody::Device),
            0x52 => StatusBody::Paginated(paginated_records(&data[22..])),
            _ => StatusBody::Opaque,
        }
    } else {
        StatusBody::Opaque
    };

    Ok(Packet::Status(StatusPacket {
        switch_id,
        response_id,
        is_response,
        body,
    }))
}

fn device_fragment(data: &[u8]) -> Option<StatusUpdate> {
    let on = *data.get(27)? > 0;
    Some(StatusUpdate {
        mesh_id: u16::from(*data.get(21)?),
        on,
        brightness: if on { *data.get(28)? } else { 0 },
        color_temp: None,
        rgb: None,
    })
}

/// Consecutive 24-byte mesh records. A trailing partial record is dropped.
fn paginated_records(mut data: &[u8]) -> Vec<StatusUpdate> {
    let mut updates = Vec::new();

    while data.len() >= 24 {
        let record = &data[..24];
        let on = record[8] > 0;
        let temp = record[16];

        updates.push(StatusUpdate {
            mesh_id: u16::from(record[0]),
            on,
            brightness: if on { record[12] } else { 0 },
            // in RGB mode the temperature byte is the 254 sentinel, not a
            // usable white temperature
            color_temp: (temp <= 100).then_some(temp),
            rgb: Some([record[20], record[21], record[22]]),
        });

        data = &data[24..];
    }

    updates
}

fn sync(data: &[u8]) -> ProtoResult<Packet> {
    need(data, 7, "sync header")?;
    let switch_id = BE::read_u32(&data[0..4]);

    let mut updates = Vec::new();
    let mut records = &data[7..];
    while records.len() >= 19 {
        let record = &records[..19];
        let on = record[4] > 0;
        updates.push(StatusUpdate {
            mesh_id: u16::from(record[3]),
            on,
            brightness: if on { record[5] } else { 0 },
            color_temp: Some(record[6]),
            rgb: None,
        });
        records = &records[19..];
    }

    Ok(Packet::Sync { switch_id, updates })
}

fn status_sync(data: &[u8]) -> ProtoResult<Packet> {
    need(data, 4, "status sync header")?;
    let switch_id = BE::read_u32(&data[0..4]);

    let update = if data.len() >= 33 {
        let on = data[27] > 0;
        Some(StatusUpdate {
            mesh_id: u16::from(data[21]),
            on,
            brightness: if on { data[28] } else { 0 },
            color_temp: None,
            rgb: None,
        })
    } else {
        None
    };

    Ok(Packet::StatusSync { switch_id, update })
}

#[cfg(test)]
mod tests {
    use crate::frame::{Frame, PacketType};
    use crate::packet::{Packet, StatusBody, StatusUpdate};

    fn status_frame(payload: Vec<u8>, is_response: bool) -> Frame {
        Frame {
            packet_type: PacketType::Status,
            is_response,
            payload,
        }
    }

    #[test]
    fn auth_reply_success() {
        let frame = Frame::request(PacketType::Auth, vec![0x00, 0x00]);
        assert_eq!(
            Packet::decode(&frame).unwrap(),
            Packet::AuthReply { success: true }
        );
    }

    #[test]
    fn auth_reply_failure() {
        let frame = Frame::request(PacketType::Auth, vec![0x00, 0x01]);
        assert_eq!(
            Packet::decode(&frame).unwrap(),
            Packet::AuthReply { success: false }
        );
    }

    #[test]
    fn auth_reply_truncated() {
        let frame = Frame::request(PacketType::Auth, vec![0x00]);
        assert!(Packet::decode(&frame).is_err());
    }

    #[test]
    fn connected_reports_switch() {
        let frame = Frame::request(PacketType::Connected, vec![0x00, 0x00, 0x00, 0x2A, 0x00]);
        assert_eq!(
            Packet::decode(&frame).unwrap(),
            Packet::Connected { switch_id: 42 }
        );
    }

    #[test]
    fn short_status_is_opaque() {
        // long enough for the header, too short for a subtype
        let frame = status_frame(vec![0x00, 0x00, 0x03, 0xE8, 0x00, 0x07, 0x00], false);
        let Packet::Status(status) = Packet::decode(&frame).unwrap() else {
            panic!("expected status");
        };
        assert_eq!(status.switch_id, 1000);
        assert_eq!(status.response_id, 7);
        assert!(!status.is_response);
        assert_eq!(status.body, StatusBody::Opaque);
    }

    #[test]
    fn device_fragment_decodes() {
        let mut payload = vec![0u8; 29];
        payload[0..4].copy_from_slice(&1000u32.to_be_bytes());
        payload[4..6].copy_from_slice(&3u16.to_be_bytes());
        payload[13] = 0xDB;
        payload[21] = 5;
        payload[27] = 1;
        payload[28] = 77;

        let Packet::Status(status) = Packet::decode(&status_frame(payload, true)).unwrap() else {
            panic!("expected status");
        };
        assert_eq!(
            status.body,
            StatusBody::Device(StatusUpdate {
                mesh_id: 5,
                on: true,
                brightness: 77,
                color_temp: None,
                rgb: None,
            })
        );
    }

    #[test]
    fn device_fragment_off_zeroes_brightness() {
        let mut payload = vec![0u8; 29];
        payload[0..4].copy_from_slice(&1000u32.to_be_bytes());
        payload[13] = 0xDB;
        payload[21] = 5;
        payload[27] = 0;
        payload[28] = 77;

        let Packet::Status(status) = Packet::decode(&status_frame(payload, true)).unwrap() else {
            panic!("expected status");
        };
        let StatusBody::Device(update) = status.body else {
            panic!("expected device fragment");
        };
        assert!(!update.on);
        assert_eq!(update.brightness, 0);
    }

    #[test]
    fn paginated_two_records() {
        // 70-byte frame: header, subtype 0x52, two 24-byte records at 22
        let mut payload = vec![0u8; 70];
        payload[0..4].copy_from_slice(&1000u32.to_be_bytes());
        payload[4..6].copy_from_slice(&9u16.to_be_bytes());
        payload[13] = 0x52;

        let first = &mut payload[22..46];
        first[0] = 5;
        first[8] = 1;
        first[12] = 80;
        first[16] = 30;
        first[20] = 10;
        first[21] = 20;
        first[22] = 30;

        let second = &mut payload[46..70];
        second[0] = 6;
        second[8] = 0;
        second[12] = 55;

        let Packet::Status(status) = Packet::decode(&status_frame(payload, true)).unwrap() else {
            panic!("expected status");
        };
        let StatusBody::Paginated(updates) = status.body else {
            panic!("expected paginated records");
        };

        assert_eq!(
            updates,
            vec![
                StatusUpdate {
                    mesh_id: 5,
                    on: true,
                    brightness: 80,
                    color_temp: Some(30),
                    rgb: Some([10, 20, 30]),
                },
                StatusUpdate {
                    mesh_id: 6,
                    on: false,
                    brightness: 0,
                    color_temp: Some(0),
                    rgb: Some([0, 0, 0]),
                },
            ]
        );
    }

    #[test]
    fn paginated_rgb_mode_suppresses_temp() {
        let mut payload = vec![0u8; 46];
        payload[0..4].copy_from_slice(&1000u32.to_be_bytes());
        payload[13] = 0x52;
        let record = &mut payload[22..46];
        record[0] = 5;
        record[8] = 1;
        record[12] = 100;
        record[16] = 254;
        record[20] = 255;

        let Packet::Status(status) = Packet::decode(&status_frame(payload, true)).unwrap() else {
            panic!("expected status");
        };
        let StatusBody::Paginated(updates) = status.body else {
            panic!("expected paginated records");
        };
        assert_eq!(updates[0].color_temp, None);
        assert_eq!(updates[0].rgb, Some([255, 0, 0]));
    }

    #[test]
    fn paginated_partial_record_dropped() {
        // one full record plus 10 stray bytes
        let mut payload = vec![0u8; 56];
        payload[0..4].copy_from_slice(&1000u32.to_be_bytes());
        payload[13] = 0x52;
        payload[22] = 7;

        let Packet::Status(status) = Packet::decode(&status_frame(payload, true)).unwrap() else {
            panic!("expected status");
        };
        let StatusBody::Paginated(updates) = status.body else {
            panic!("expected paginated records");
        };
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].mesh_id, 7);
    }

    #[test]
    fn sync_broadcast() {
        let mut payload = vec![0u8; 7 + 19 * 2];
        payload[0..4].copy_from_slice(&77u32.to_be_bytes());

        let first = &mut payload[7..26];
        first[3] = 3;
        first[4] = 1;
        first[5] = 42;
        first[6] = 12;

        let second = &mut payload[26..45];
        second[3] = 4;
        second[4] = 0;
        second[5] = 99;

        let frame = Frame::request(PacketType::Sync, payload);
        let Packet::Sync { switch_id, updates } = Packet::decode(&frame).unwrap() else {
            panic!("expected sync");
        };
        assert_eq!(switch_id, 77);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].mesh_id, 3);
        assert!(updates[0].on);
        assert_eq!(updates[0].brightness, 42);
        assert_eq!(updates[0].color_temp, Some(12));
        assert!(!updates[1].on);
        assert_eq!(updates[1].brightness, 0);
    }

    #[test]
    fn status_sync_delta() {
        let mut payload = vec![0u8; 33];
        payload[0..4].copy_from_slice(&88u32.to_be_bytes());
        payload[21] = 9;
        payload[27] = 1;
        payload[28] = 60;

        let frame = Frame::request(PacketType::StatusSync, payload);
        let Packet::StatusSync { switch_id, update } = Packet::decode(&frame).unwrap() else {
            panic!("expected status sync");
        };
        assert_eq!(switch_id, 88);
        let update = update.unwrap();
        assert_eq!(update.mesh_id, 9);
        assert!(update.on);
        assert_eq!(update.brightness, 60);
    }

    #[test]
    fn status_sync_too_short_for_delta() {
        let frame = Frame::request(PacketType::StatusSync, vec![0u8; 20]);
        let Packet::StatusSync { update, .. } = Packet::decode(&frame).unwrap() else {
            panic!("expected status sync");
        };
        assert!(update.is_none());
    }
}
