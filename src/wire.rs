//! Wire primitives for the proto3 binary format.
//!
//! Pure byte-level functions with no knowledge of message structure:
//! varints, zigzag, tags, length-delimited framing, and field skipping.
//! Everything here is `pub` so generated code and hand-rolled codecs can
//! reuse it.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{CodecError, Result};

/// Maximum nesting depth for message decoding. A deeper buffer fails with
/// [`CodecError::MaxDepthExceeded`] instead of overflowing the call stack.
pub const RECURSION_LIMIT: usize = 100;

/// A varint never spans more than 10 bytes (64 bits in 7-bit groups).
const MAX_VARINT_BYTES: usize = 10;

/// The largest field number a tag may carry (2^29 - 1, the protobuf limit).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The 3-bit payload-shape code carried in every tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl WireType {
    /// Maps a tag's wire-type code to a `WireType`.
    ///
    /// # Errors
    /// Returns `MalformedWireType` for codes other than 0, 1, 2 and 5
    /// (the deprecated group codes 3 and 4 are not supported).
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(CodecError::MalformedWireType(other)),
        }
    }
}

/// Appends `value` as a little-endian base-128 varint.
pub fn encode_varint(mut value: u64, writer: &mut BytesMut) {
    loop {
        if value < 0x80 {
            writer.put_u8(value as u8);
            return;
        }
        writer.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
}

/// Reads one varint.
///
/// # Errors
/// Returns `MalformedVarint` if the continuation chain exceeds 10 bytes or
/// the input ends mid-sequence.
pub fn decode_varint(reader: &mut Bytes) -> Result<u64> {
    let mut value = 0u64;
    for shift in 0..MAX_VARINT_BYTES {
        if !reader.has_remaining() {
            return Err(CodecError::MalformedVarint);
        }
        let byte = reader.get_u8();
        value |= ((byte & 0x7f) as u64) << (shift * 7);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::MalformedVarint)
}

/// Number of bytes `encode_varint` produces for `value`.
pub const fn varint_len(value: u64) -> usize {
    // 7-bit groups; `| 1` makes zero take one group.
    ((64 - (value | 1).leading_zeros() as usize) + 6) / 7
}

/// Zigzag mapping for 32-bit signed values: small magnitudes stay short.
pub const fn zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [`zigzag32`].
pub const fn unzigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Zigzag mapping for 64-bit signed values.
pub const fn zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag64`].
pub const fn unzigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Appends the tag `varint((number << 3) | wire_type_code)`.
pub fn encode_key(number: u32, wire_type: WireType, writer: &mut BytesMut) {
    encode_varint(((number as u64) << 3) | wire_type as u64, writer);
}

/// Reads one tag and splits it into field number and wire type.
///
/// # Errors
/// Besides varint and wire-type errors, rejects field numbers outside
/// `1..=MAX_FIELD_NUMBER`; truncating an oversized 64-bit tag could alias
/// a known field number.
pub fn decode_key(reader: &mut Bytes) -> Result<(u32, WireType)> {
    if !reader.has_remaining() {
        return Err(CodecError::TruncatedInput);
    }
    let key = decode_varint(reader)?;
    let wire_type = WireType::from_code((key & 0x7) as u8)?;
    let number = key >> 3;
    if number == 0 || number > MAX_FIELD_NUMBER as u64 {
        return Err(CodecError::Decode(format!(
            "field number {} is outside the valid range 1..={}",
            number, MAX_FIELD_NUMBER
        )));
    }
    Ok((number as u32, wire_type))
}

/// Byte length of the tag for `number` (the wire type never changes it).
pub const fn key_len(number: u32) -> usize {
    varint_len((number as u64) << 3)
}

/// Reads a length prefix and splits off exactly that many bytes.
///
/// # Errors
/// Returns `TruncatedPayload` if fewer than `length` bytes remain.
pub fn take_length_delimited(reader: &mut Bytes) -> Result<Bytes> {
    let declared = decode_varint(reader)? as usize;
    if reader.remaining() < declared {
        return Err(CodecError::TruncatedPayload {
            declared,
            remaining: reader.remaining(),
        });
    }
    Ok(reader.split_to(declared))
}

/// Consumes one field's payload according to its wire type, without
/// interpreting it. Used for field numbers absent from a type's metadata.
pub fn skip_field(wire_type: WireType, reader: &mut Bytes) -> Result<()> {
    match wire_type {
        WireType::Varint => {
            decode_varint(reader)?;
        }
        WireType::Fixed64 => {
            if reader.remaining() < 8 {
                return Err(CodecError::TruncatedInput);
            }
            reader.advance(8);
        }
        WireType::LengthDelimited => {
            take_length_delimited(reader)?;
        }
        WireType::Fixed32 => {
            if reader.remaining() < 4 {
                return Err(CodecError::TruncatedInput);
            }
            reader.advance(4);
        }
    }
    Ok(())
}
