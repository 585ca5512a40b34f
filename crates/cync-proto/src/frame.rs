use std::io::Read;

use byteorder::{BigEndian as BE, ReadBytesExt};
use packed_struct::prelude::*;

use crate::error::{ProtoError, ProtoResult};

/// Protocol version constant carried in the low bits of every type byte.
/// The server rejects frames without it.
pub const PROTOCOL_VERSION: u8 = 0x03;

/// Size of the outer frame header: type byte plus big-endian payload length.
pub const HEADER_LEN: usize = 5;

#[derive(PrimitiveEnum_u8, Debug, Clone, Copy, Eq, PartialEq)]
pub enum PacketType {
    /// Login request / status reply.
    Auth = 1,
    /// Mesh state broadcast, multiple records per frame.
    Sync = 4,
    /// Subtype-tagged request/response envelope.
    Status = 7,
    /// Single-device state delta.
    StatusSync = 8,
    /// Reachability probe and its answer.
    Connected = 10,
    /// Empty-payload keep-alive.
    Ping = 13,
}

/// The type byte packs the packet type in the high nibble, a response flag
/// at bit 3, and the protocol version in the low three bits.
#[derive(PackedStruct, Clone, Copy)]
#[packed_struct(size_bytes = "1", bit_numbering = "lsb0")]
pub struct TypeByte {
    #[packed_field(bits = "0..3")]
    pub version: Integer<u8, packed_bits::Bits<3>>,

    #[packed_field(bits = "3")]
    pub is_response: bool,

    #[packed_field(bits = "4..8", ty = "enum")]
    pub packet_type: PacketType,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FrameHeader {
    pub packet_type: PacketType,
    pub is_response: bool,
    pub length: u32,
}

impl FrameHeader {
    pub fn parse(data: &mut impl Read) -> ProtoResult<Self> {
        let raw = data.read_u8()?;
        let tb =
            TypeByte::unpack(&[raw]).map_err(|_| ProtoError::UnknownPacketType(raw >> 4))?;
        let length = data.read_u32::<BE>()?;

        Ok(Self {
            packet_type: tb.packet_type,
            is_response: tb.is_response,
            length,
        })
    }
}

/// A single framed packet, outer layer only. The payload is opaque at this
/// level; [`crate::packet`] and [`crate::request`] give it meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: PacketType,
    pub is_response: bool,
    pub payload: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub const fn request(packet_type: PacketType, payload: Vec<u8>) -> Self {
        Self {
            packet_type,
            is_response: false,
            payload,
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        let mut type_byte = ((self.packet_type as u8) << 4) | PROTOCOL_VERSION;
        if self.is_response {
            type_byte |= 0x08;
        }
        buf.push(type_byte);
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    pub fn decode(data: &mut impl Read) -> ProtoResult<Self> {
        let header = FrameHeader::parse(data)?;
        let mut payload = vec![0; header.length as usize];
        data.read_exact(&mut payload)?;

        Ok(Self {
            packet_type: header.packet_type,
            is_response: header.is_response,
            payload,
        })
    }
}
