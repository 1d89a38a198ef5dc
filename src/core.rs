//! `Value` implementations for every supported field type, the signed/fixed
//! wrapper newtypes, and the field-level helpers the derived code calls.
//!
//! Field-level helpers pair a [`Value`] with a field number and a container
//! shape (singular, optional, repeated, map entry, oneof alternative) and
//! handle tags, presence and proto3 default omission.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::wire::{self, WireType};
use crate::{CodecError, Result, Value};

// --- Wrapper types selecting alternate integer representations ---

/// A 32-bit signed integer encoded with zigzag (proto `sint32`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sint32(pub i32);

/// A 64-bit signed integer encoded with zigzag (proto `sint64`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sint64(pub i64);

/// A 32-bit unsigned integer encoded as 4 little-endian bytes (proto `fixed32`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed32(pub u32);

/// A 64-bit unsigned integer encoded as 8 little-endian bytes (proto `fixed64`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed64(pub u64);

/// A 32-bit signed integer encoded as 4 little-endian bytes (proto `sfixed32`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sfixed32(pub i32);

/// A 64-bit signed integer encoded as 8 little-endian bytes (proto `sfixed64`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sfixed64(pub i64);

// --- Plain varint integers ---

/// Proto `uint32`: plain varint.
impl Value for u32 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(*self as u64, writer);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        *self = wire::decode_varint(reader)? as u32;
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(*self as u64)
    }

    fn is_default(&self) -> bool {
        *self == 0
    }
}

/// Proto `uint64`: plain varint.
impl Value for u64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(*self, writer);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        *self = wire::decode_varint(reader)?;
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(*self)
    }

    fn is_default(&self) -> bool {
        *self == 0
    }
}

/// Proto `int32`: the two's-complement bit pattern sign-extended to 64 bits
/// and varint-encoded, so negative values always take 10 bytes. Use
/// [`Sint32`] where negatives are common.
impl Value for i32 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(*self as i64 as u64, writer);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        *self = wire::decode_varint(reader)? as i32;
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(*self as i64 as u64)
    }

    fn is_default(&self) -> bool {
        *self == 0
    }
}

/// Proto `int64`: see `i32` for the negative-value layout.
impl Value for i64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(*self as u64, writer);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        *self = wire::decode_varint(reader)? as i64;
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(*self as u64)
    }

    fn is_default(&self) -> bool {
        *self == 0
    }
}

/// Proto `bool`: varint 0 or 1. Any non-zero varint decodes as `true`.
impl Value for bool {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encode_value(&self, writer: &mut BytesMut) {
        writer.put_u8(*self as u8);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        *self = wire::decode_varint(reader)? != 0;
        Ok(())
    }

    fn value_size(&self) -> usize {
        1
    }

    fn is_default(&self) -> bool {
        !(*self)
    }
}

// --- Zigzag varint integers ---

impl Value for Sint32 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(wire::zigzag32(self.0) as u64, writer);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        self.0 = wire::unzigzag32(wire::decode_varint(reader)? as u32);
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(wire::zigzag32(self.0) as u64)
    }

    fn is_default(&self) -> bool {
        self.0 == 0
    }
}

impl Value for Sint64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(wire::zigzag64(self.0), writer);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        self.0 = wire::unzigzag64(wire::decode_varint(reader)?);
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(wire::zigzag64(self.0))
    }

    fn is_default(&self) -> bool {
        self.0 == 0
    }
}

// --- Fixed-width integers and floats ---

/// Checks that a fixed-width read has enough bytes left.
#[inline]
fn check_remaining(reader: &Bytes, needed: usize) -> Result<()> {
    if reader.remaining() < needed {
        return Err(CodecError::TruncatedInput);
    }
    Ok(())
}

impl Value for Fixed32 {
    const WIRE_TYPE: WireType = WireType::Fixed32;

    fn encode_value(&self, writer: &mut BytesMut) {
        writer.put_u32_le(self.0);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        check_remaining(reader, 4)?;
        self.0 = reader.get_u32_le();
        Ok(())
    }

    fn value_size(&self) -> usize {
        4
    }

    fn is_default(&self) -> bool {
        self.0 == 0
    }
}

impl Value for Fixed64 {
    const WIRE_TYPE: WireType = WireType::Fixed64;

    fn encode_value(&self, writer: &mut BytesMut) {
        writer.put_u64_le(self.0);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        check_remaining(reader, 8)?;
        self.0 = reader.get_u64_le();
        Ok(())
    }

    fn value_size(&self) -> usize {
        8
    }

    fn is_default(&self) -> bool {
        self.0 == 0
    }
}

impl Value for Sfixed32 {
    const WIRE_TYPE: WireType = WireType::Fixed32;

    fn encode_value(&self, writer: &mut BytesMut) {
        writer.put_i32_le(self.0);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        check_remaining(reader, 4)?;
        self.0 = reader.get_i32_le();
        Ok(())
    }

    fn value_size(&self) -> usize {
        4
    }

    fn is_default(&self) -> bool {
        self.0 == 0
    }
}

impl Value for Sfixed64 {
    const WIRE_TYPE: WireType = WireType::Fixed64;

    fn encode_value(&self, writer: &mut BytesMut) {
        writer.put_i64_le(self.0);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        check_remaining(reader, 8)?;
        self.0 = reader.get_i64_le();
        Ok(())
    }

    fn value_size(&self) -> usize {
        8
    }

    fn is_default(&self) -> bool {
        self.0 == 0
    }
}

/// Proto `float`: IEEE 754, 4 little-endian bytes.
impl Value for f32 {
    const WIRE_TYPE: WireType = WireType::Fixed32;

    fn encode_value(&self, writer: &mut BytesMut) {
        writer.put_f32_le(*self);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        check_remaining(reader, 4)?;
        *self = reader.get_f32_le();
        Ok(())
    }

    fn value_size(&self) -> usize {
        4
    }

    fn is_default(&self) -> bool {
        *self == 0.0
    }
}

/// Proto `double`: IEEE 754, 8 little-endian bytes.
impl Value for f64 {
    const WIRE_TYPE: WireType = WireType::Fixed64;

    fn encode_value(&self, writer: &mut BytesMut) {
        writer.put_f64_le(*self);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        check_remaining(reader, 8)?;
        *self = reader.get_f64_le();
        Ok(())
    }

    fn value_size(&self) -> usize {
        8
    }

    fn is_default(&self) -> bool {
        *self == 0.0
    }
}

// --- Length-delimited values ---

/// Proto `string`: length-delimited UTF-8 bytes.
impl Value for String {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(self.len() as u64, writer);
        writer.put_slice(self.as_bytes());
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        let body = wire::take_length_delimited(reader)?;
        *self = String::from_utf8(body.to_vec()).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(self.len() as u64) + self.len()
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

/// Proto `bytes`: length-delimited raw bytes.
impl Value for Vec<u8> {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(self.len() as u64, writer);
        writer.put_slice(self);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        *self = wire::take_length_delimited(reader)?.to_vec();
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(self.len() as u64) + self.len()
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

/// Proto `bytes` without the copy: decoding splits the payload off the
/// input buffer.
impl Value for Bytes {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn encode_value(&self, writer: &mut BytesMut) {
        wire::encode_varint(self.len() as u64, writer);
        writer.put_slice(self);
    }

    fn merge_value(&mut self, reader: &mut Bytes, _depth: usize) -> Result<()> {
        *self = wire::take_length_delimited(reader)?;
        Ok(())
    }

    fn value_size(&self) -> usize {
        wire::varint_len(self.len() as u64) + self.len()
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

/// `Box<T>` delegates to the boxed value. Enables recursive message types.
impl<T: Value> Value for Box<T> {
    const WIRE_TYPE: WireType = T::WIRE_TYPE;

    fn encode_value(&self, writer: &mut BytesMut) {
        (**self).encode_value(writer)
    }

    fn merge_value(&mut self, reader: &mut Bytes, depth: usize) -> Result<()> {
        (**self).merge_value(reader, depth)
    }

    fn value_size(&self) -> usize {
        (**self).value_size()
    }

    fn is_default(&self) -> bool {
        (**self).is_default()
    }
}

// --- Field-level helpers used by the generated code ---

/// Rejects a record whose wire type does not match the field's declared
/// category. Proceeding would misparse the rest of the buffer.
fn check_wire_type(expected: WireType, actual: WireType) -> Result<()> {
    if expected != actual {
        return Err(CodecError::Decode(format!(
            "expected wire type {:?}, got {:?}",
            expected, actual
        )));
    }
    Ok(())
}

/// Encodes a singular field: tag + value, omitted entirely when the value
/// is the proto3 default.
pub fn encode_field<T: Value>(number: u32, value: &T, writer: &mut BytesMut) {
    if value.is_default() {
        return;
    }
    wire::encode_key(number, T::WIRE_TYPE, writer);
    value.encode_value(writer);
}

/// Size of a singular field, zero when omitted.
pub fn field_size<T: Value>(number: u32, value: &T) -> usize {
    if value.is_default() {
        return 0;
    }
    wire::key_len(number) + value.value_size()
}

/// Decodes one record into a singular field. Last one wins.
pub fn merge_singular<T: Value>(
    value: &mut T,
    wire_type: WireType,
    reader: &mut Bytes,
    depth: usize,
) -> Result<()> {
    check_wire_type(T::WIRE_TYPE, wire_type)?;
    value.merge_value(reader, depth)
}

/// Encodes an optional field: present values are always written, even when
/// the inner value is the default, so presence survives the round trip.
pub fn encode_optional<T: Value>(number: u32, value: &Option<T>, writer: &mut BytesMut) {
    if let Some(inner) = value {
        wire::encode_key(number, T::WIRE_TYPE, writer);
        inner.encode_value(writer);
    }
}

/// Size of an optional field, zero when absent.
pub fn optional_size<T: Value>(number: u32, value: &Option<T>) -> usize {
    match value {
        Some(inner) => wire::key_len(number) + inner.value_size(),
        None => 0,
    }
}

/// Decodes one record into an optional field, constructing the presence
/// wrapper if absent.
pub fn merge_optional<T: Value + Default>(
    value: &mut Option<T>,
    wire_type: WireType,
    reader: &mut Bytes,
    depth: usize,
) -> Result<()> {
    check_wire_type(T::WIRE_TYPE, wire_type)?;
    value
        .get_or_insert_with(T::default)
        .merge_value(reader, depth)
}

/// Encodes a repeated field in unpacked form: one tag per element, in
/// sequence order. Elements are written unconditionally, default or not.
pub fn encode_repeated<T: Value>(number: u32, values: &[T], writer: &mut BytesMut) {
    for value in values {
        wire::encode_key(number, T::WIRE_TYPE, writer);
        value.encode_value(writer);
    }
}

/// Size of an unpacked repeated field.
pub fn repeated_size<T: Value>(number: u32, values: &[T]) -> usize {
    values
        .iter()
        .map(|value| wire::key_len(number) + value.value_size())
        .sum()
}

/// Decodes one element of a repeated field and appends it.
pub fn merge_repeated<T: Value + Default>(
    values: &mut Vec<T>,
    wire_type: WireType,
    reader: &mut Bytes,
    depth: usize,
) -> Result<()> {
    check_wire_type(T::WIRE_TYPE, wire_type)?;
    let mut value = T::default();
    value.merge_value(reader, depth)?;
    values.push(value);
    Ok(())
}

/// Body size of the synthetic two-field entry message (key at 1, value at 2).
fn map_entry_body_size<K: Value, V: Value>(key: &K, value: &V) -> usize {
    wire::key_len(1) + key.value_size() + wire::key_len(2) + value.value_size()
}

/// Encodes one map entry as a length-delimited two-field sub-message under
/// the map's field number. Both sub-fields are written unconditionally so
/// zero keys and empty values survive the round trip.
pub fn encode_map_entry<K: Value, V: Value>(
    number: u32,
    key: &K,
    value: &V,
    writer: &mut BytesMut,
) {
    let body = map_entry_body_size(key, value);
    wire::encode_key(number, WireType::LengthDelimited, writer);
    wire::encode_varint(body as u64, writer);
    wire::encode_key(1, K::WIRE_TYPE, writer);
    key.encode_value(writer);
    wire::encode_key(2, V::WIRE_TYPE, writer);
    value.encode_value(writer);
}

/// Size of one encoded map entry including its tag and length prefix.
pub fn map_entry_size<K: Value, V: Value>(number: u32, key: &K, value: &V) -> usize {
    let body = map_entry_body_size(key, value);
    wire::key_len(number) + wire::varint_len(body as u64) + body
}

/// Decodes one map entry into its key/value pair. Missing sub-fields take
/// their defaults; unknown sub-field numbers inside the entry are skipped.
/// The caller inserts the pair, so the same key appearing twice in the
/// input overwrites (last one wins).
pub fn merge_map_entry<K: Value + Default, V: Value + Default>(
    wire_type: WireType,
    reader: &mut Bytes,
    depth: usize,
) -> Result<(K, V)> {
    check_wire_type(WireType::LengthDelimited, wire_type)?;
    let mut entry = wire::take_length_delimited(reader)?;
    let mut key = K::default();
    let mut value = V::default();
    while entry.has_remaining() {
        let (number, wt) = wire::decode_key(&mut entry)?;
        match number {
            1 => merge_singular(&mut key, wt, &mut entry, depth)?,
            2 => merge_singular(&mut value, wt, &mut entry, depth)?,
            _ => wire::skip_field(wt, &mut entry)?,
        }
    }
    Ok((key, value))
}

/// Encodes the active alternative of a variant field: tag + value, written
/// unconditionally so the selected alternative is never ambiguous.
pub fn encode_oneof_field<T: Value>(number: u32, value: &T, writer: &mut BytesMut) {
    wire::encode_key(number, T::WIRE_TYPE, writer);
    value.encode_value(writer);
}

/// Size of one encoded variant alternative.
pub fn oneof_field_size<T: Value>(number: u32, value: &T) -> usize {
    wire::key_len(number) + value.value_size()
}
