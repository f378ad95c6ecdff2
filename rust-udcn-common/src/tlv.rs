//! TLV (Type-Length-Value) encoding and decoding utilities.
//!
//! This module provides functions for encoding and decoding NDN TLV packets,
//! following the NDN packet format (2022 revision). TLV-TYPE fields are
//! restricted to a single byte here, which covers every type this crate
//! emits or consumes; experimental/private-use ranges above 255 are out of
//! scope.

use crate::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// NDN TLV packet types
pub const TLV_INTEREST: u8 = 0x05;
pub const TLV_DATA: u8 = 0x06;
pub const TLV_NACK: u8 = 0x03;
pub const TLV_NAME: u8 = 0x07;
pub const TLV_COMPONENT: u8 = 0x08;
pub const TLV_CAN_BE_PREFIX: u8 = 0x21;
pub const TLV_MUST_BE_FRESH: u8 = 0x12;
pub const TLV_FORWARDING_HINT: u8 = 0x1E;
pub const TLV_NONCE: u8 = 0x0A;
pub const TLV_INTEREST_LIFETIME: u8 = 0x0C;
pub const TLV_HOP_LIMIT: u8 = 0x22;
pub const TLV_APPLICATION_PARAMETERS: u8 = 0x24;
pub const TLV_SELECTORS: u8 = 0x09;
pub const TLV_META_INFO: u8 = 0x14;
pub const TLV_CONTENT: u8 = 0x15;
pub const TLV_SIGNATURE_INFO: u8 = 0x16;
pub const TLV_SIGNATURE_VALUE: u8 = 0x17;
pub const TLV_CONTENT_TYPE: u8 = 0x18;
pub const TLV_FRESHNESS_PERIOD: u8 = 0x19;
pub const TLV_FINAL_BLOCK_ID: u8 = 0x1A;
pub const TLV_SIGNATURE_TYPE: u8 = 0x1B;
pub const TLV_KEY_LOCATOR: u8 = 0x1C;
pub const TLV_KEY_DIGEST: u8 = 0x1D;

/// Name component type codes (NDN naming convention rev3).
pub const TLV_COMPONENT_IMPLICIT_SHA256_DIGEST: u8 = 0x01;
pub const TLV_COMPONENT_PARAMETERS_SHA256_DIGEST: u8 = 0x02;
pub const TLV_COMPONENT_GENERIC: u8 = 0x08;
pub const TLV_COMPONENT_KEYWORD: u8 = 0x20;
pub const TLV_COMPONENT_SEGMENT: u8 = 0x32;
pub const TLV_COMPONENT_BYTE_OFFSET: u8 = 0x34;
pub const TLV_COMPONENT_VERSION: u8 = 0x36;
pub const TLV_COMPONENT_TIMESTAMP: u8 = 0x38;
pub const TLV_COMPONENT_SEQUENCE_NUM: u8 = 0x3A;

/// Encodes a TLV type field.
///
/// Currently only supports single-byte TLV types (0-255).
pub fn encode_tlv_type(tlv_type: u8, buf: &mut BytesMut) {
    buf.put_u8(tlv_type);
}

/// Encodes a TLV length field.
///
/// Supports variable-length encoding:
/// - If length < 253, uses 1 byte
/// - If length <= 65535, uses 3 bytes (253 + 2 bytes)
/// - If length > 65535, uses 5 bytes (254 + 4 bytes)
pub fn encode_tlv_length(length: usize, buf: &mut BytesMut) {
    if length < 253 {
        buf.put_u8(length as u8);
    } else if length <= 65535 {
        buf.put_u8(253);
        buf.put_u16(length as u16);
    } else {
        buf.put_u8(254);
        buf.put_u32(length as u32);
    }
}

/// Decodes a TLV type field.
///
/// Currently only supports single-byte TLV types (0-255).
pub fn decode_tlv_type(buf: &mut impl Buf) -> Result<u8, Error> {
    if !buf.has_remaining() {
        return Err(Error::Tlv("Buffer underflow when decoding TLV type".into()));
    }
    Ok(buf.get_u8())
}

/// Decodes a TLV length field.
///
/// Handles variable-length encoding as per NDN spec.
pub fn decode_tlv_length(buf: &mut impl Buf) -> Result<usize, Error> {
    if !buf.has_remaining() {
        return Err(Error::Tlv("Buffer underflow when decoding TLV length".into()));
    }

    let first_byte = buf.get_u8();

    match first_byte {
        // Small length (< 253)
        0..=252 => Ok(first_byte as usize),

        // Medium length (16 bits)
        253 => {
            if buf.remaining() < 2 {
                return Err(Error::Tlv("Buffer underflow when decoding 16-bit TLV length".into()));
            }
            Ok(buf.get_u16() as usize)
        }

        // Large length (32 bits)
        254 => {
            if buf.remaining() < 4 {
                return Err(Error::Tlv("Buffer underflow when decoding 32-bit TLV length".into()));
            }
            Ok(buf.get_u32() as usize)
        }

        // Very large length (64 bits) - not supported in this implementation
        255 => Err(Error::Tlv("64-bit TLV lengths not supported".into())),

        // This branch should be unreachable with u8 values
        _ => Err(Error::Tlv("Invalid TLV length encoding".into())),
    }
}

/// A generic TLV element consisting of a type, length, and value.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvElement {
    pub tlv_type: u8,
    pub value: Bytes,
}

impl TlvElement {
    /// Creates a new TLV element.
    pub fn new(tlv_type: u8, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Returns the total length of this TLV element when encoded.
    pub fn len(&self) -> usize {
        let value_len = self.value.len();
        // Type (1 byte) + Length (variable) + Value
        1 + tlv_length_size(value_len) + value_len
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Encodes this TLV element into the provided buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_tlv_type(self.tlv_type, buf);
        encode_tlv_length(self.value.len(), buf);
        buf.extend_from_slice(&self.value);
    }

    /// Decodes a TLV element from the provided buffer.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        if buf.remaining() < 2 {
            return Err(Error::Tlv("Buffer too small for TLV".into()));
        }

        let tlv_type = decode_tlv_type(buf)?;
        let length = decode_tlv_length(buf)?;

        if buf.remaining() < length {
            return Err(Error::Tlv(format!(
                "Buffer underflow: TLV value requires {} bytes but only {} available",
                length,
                buf.remaining()
            )));
        }

        let mut value = BytesMut::with_capacity(length);
        let mut take = buf.take(length);
        value.put(&mut take);

        Ok(Self {
            tlv_type,
            value: value.freeze(),
        })
    }

    /// Encodes a `u64` as an NDN NonNegativeInteger TLV value (1/2/4/8 bytes,
    /// minimal width).
    pub fn encode_nonneg(tlv_type: u8, value: u64) -> Self {
        let bytes = if value <= u8::MAX as u64 {
            Bytes::copy_from_slice(&(value as u8).to_be_bytes())
        } else if value <= u16::MAX as u64 {
            Bytes::copy_from_slice(&(value as u16).to_be_bytes())
        } else if value <= u32::MAX as u64 {
            Bytes::copy_from_slice(&(value as u32).to_be_bytes())
        } else {
            Bytes::copy_from_slice(&value.to_be_bytes())
        };
        Self::new(tlv_type, bytes)
    }

    /// Decodes an NDN NonNegativeInteger TLV value.
    pub fn decode_nonneg(&self) -> Result<u64, Error> {
        match self.value.len() {
            1 => Ok(self.value[0] as u64),
            2 => Ok(u16::from_be_bytes(self.value[..2].try_into().unwrap()) as u64),
            4 => Ok(u32::from_be_bytes(self.value[..4].try_into().unwrap()) as u64),
            8 => Ok(u64::from_be_bytes(self.value[..8].try_into().unwrap())),
            n => Err(Error::Tlv(format!("Invalid NonNegativeInteger length {}", n))),
        }
    }
}

/// Returns the number of bytes needed to encode the given length.
fn tlv_length_size(length: usize) -> usize {
    if length < 253 {
        1 // 1 byte for length < 253
    } else if length <= 65535 {
        3 // 1 byte marker (253) + 2 bytes length
    } else {
        5 // 1 byte marker (254) + 4 bytes length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_short_and_long_values() {
        let mut buf = BytesMut::new();
        let elem = TlvElement::new(TLV_NONCE, Bytes::from_static(&[1, 2, 3, 4]));
        elem.encode(&mut buf);
        let mut cursor = buf.freeze();
        let decoded = TlvElement::decode(&mut cursor).unwrap();
        assert_eq!(decoded, elem);
    }

    #[test]
    fn nonneg_roundtrip_picks_minimal_width() {
        let e = TlvElement::encode_nonneg(TLV_INTEREST_LIFETIME, 4000);
        assert_eq!(e.value.len(), 2);
        assert_eq!(e.decode_nonneg().unwrap(), 4000);

        let e = TlvElement::encode_nonneg(TLV_INTEREST_LIFETIME, 42);
        assert_eq!(e.value.len(), 1);
        assert_eq!(e.decode_nonneg().unwrap(), 42);
    }
}
