//! # protoflect
//!
//! A schema-free Protocol Buffers wire-format codec for Rust.
//!
//! - Byte-compatible with the proto3 wire encoding: tags, varints, zigzag,
//!   fixed-width fields, length-delimited framing, map-as-submessage
//! - No `.proto` file and no code-generation step: the native struct *is*
//!   the schema, described once via `#[derive(Message)]`
//! - Supports nested messages, `Option` presence, repeated fields, maps,
//!   enumerations, and variant (oneof) fields spanning a range of field numbers
//! - Unknown field numbers are skipped on decode for forward compatibility
//!
//! ## Field numbering
//!
//! Field numbers are assigned positionally starting at 1, in declaration
//! order. A variant field occupies one number per alternative, so the field
//! after it continues past the whole range. Use `#[pb(number = N)]` to pin a
//! field to an explicit number; later fields continue from there and gaps
//! are allowed.
//!
//! ## Attribute Macros
//!
//! - `#[pb(number = N)]` — Assigns an explicit field number (u32, >= 1).
//! - `#[pb(oneof)]` — Marks a field whose type derives [`Oneof`]; the field
//!   spans `VARIANTS` consecutive numbers starting at its base number.
//!
//! ## Wrapper types
//!
//! Plain `i32`/`i64` fields encode as proto `int32`/`int64` (two's
//! complement varint, 10 bytes when negative). The newtypes [`Sint32`],
//! [`Sint64`] (zigzag), [`Fixed32`], [`Fixed64`], [`Sfixed32`] and
//! [`Sfixed64`] (little-endian fixed width) select the other proto integer
//! representations.
//!
//! ## Example
//!
//! ```rust
//! use protoflect::{to_bytes, from_bytes, Message};
//!
//! #[derive(Message, Default, PartialEq, Debug)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let value = Point { x: 3, y: 4 };
//! let buf = to_bytes(&value);
//! assert_eq!(protoflect::encoded_size(&value), buf.len());
//! let decoded: Point = from_bytes(buf).unwrap();
//! assert_eq!(value, decoded);
//! ```

pub mod core;
pub mod wire;

pub use bytes;
use bytes::{Buf, Bytes, BytesMut};
pub use protoflect_derive::{Enumeration, Message, Oneof};

pub use crate::core::{
    encode_field, encode_map_entry, encode_oneof_field, encode_optional, encode_repeated,
    field_size, map_entry_size, merge_map_entry, merge_optional, merge_repeated, merge_singular,
    oneof_field_size, optional_size, repeated_size, Fixed32, Fixed64, Sfixed32, Sfixed64, Sint32,
    Sint64,
};
pub use crate::wire::WireType;

/// Errors that can occur while decoding the proto3 wire format.
///
/// Encoding is total for any type with derived metadata and never fails.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A varint continuation chain ran past 10 bytes, or the input ended
    /// mid-sequence.
    #[error("malformed varint: continuation chain exceeds 10 bytes or input ended mid-sequence")]
    MalformedVarint,
    /// The input ended before a complete tag or fixed-width value could be read.
    #[error("truncated input: fewer bytes remain than the field requires")]
    TruncatedInput,
    /// A length-delimited block declared more bytes than remain in the input.
    #[error("truncated payload: {declared} bytes declared but only {remaining} remain")]
    TruncatedPayload { declared: usize, remaining: usize },
    /// A tag carried a wire-type code other than 0, 1, 2 or 5.
    #[error("wire type code {0} is not a valid proto wire type")]
    MalformedWireType(u8),
    /// Nested message decoding exceeded the recursion limit.
    #[error("message nesting exceeds the decode depth limit of {0}")]
    MaxDepthExceeded(usize),
    /// The payload was well-framed but its value could not be interpreted
    /// (e.g., invalid UTF-8, unknown enum value, wire type mismatch).
    #[error("decode error: {0}")]
    Decode(String),
}

/// The result type used throughout this crate for decode operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// A struct that can be encoded to and decoded from the proto3 wire format.
///
/// Implemented via `#[derive(Message)]`; the derive builds the per-field
/// dispatch from the struct's declared fields and numbers.
pub trait Message {
    /// Encode all non-default fields, in declaration order, without any
    /// outer framing. Appends to `writer` and never fails.
    fn encode_raw(&self, writer: &mut BytesMut);

    /// Decode one `(field number, wire type, payload)` record into the
    /// matching field. Field numbers absent from the type's metadata are
    /// skipped per their wire type.
    fn merge_field(
        &mut self,
        number: u32,
        wire_type: WireType,
        reader: &mut Bytes,
        depth: usize,
    ) -> Result<()>;

    /// The exact serialized byte length of `encode_raw`'s output, computed
    /// without materializing it.
    fn encoded_size(&self) -> usize;

    /// Decode records until `reader` is exhausted, merging into `self`.
    ///
    /// Scalars overwrite (last one wins), repeated fields append, maps
    /// insert per key, nested messages merge recursively.
    fn merge(&mut self, reader: &mut Bytes, depth: usize) -> Result<()> {
        while reader.has_remaining() {
            let (number, wire_type) = wire::decode_key(reader)?;
            self.merge_field(number, wire_type, reader, depth)?;
        }
        Ok(())
    }
}

/// A single wire-format value: the scalar-level half of the codec.
///
/// Implemented for every supported scalar, for `String`/bytes, for the
/// signed/fixed wrapper newtypes, for `Box<T>`, and (via the derives) for
/// messages and enumerations. Field-level concerns — tags, presence,
/// repetition — live in the helpers of [`core`].
pub trait Value: Sized {
    /// The wire type this value is framed with.
    const WIRE_TYPE: WireType;

    /// Append the value's wire representation (without a tag).
    fn encode_value(&self, writer: &mut BytesMut);

    /// Consume exactly one value of this type from `reader`, replacing or
    /// merging into `self`. For length-delimited values this includes the
    /// length prefix.
    fn merge_value(&mut self, reader: &mut Bytes, depth: usize) -> Result<()>;

    /// The byte length `encode_value` would produce.
    fn value_size(&self) -> usize;

    /// True if this value equals the proto3 default for its type. Singular
    /// fields with default values are omitted from the output.
    fn is_default(&self) -> bool;
}

/// A variant (oneof) field: a sum type spanning a contiguous range of field
/// numbers, one per alternative.
///
/// Implemented via `#[derive(Oneof)]` on an enum whose variants each hold
/// exactly one value. Alternative `i` (zero-based) is addressed at field
/// number `base + i`. The derive also generates `Default` (the first
/// alternative with a default payload).
pub trait Oneof: Sized {
    /// How many consecutive field numbers this variant field occupies.
    const VARIANTS: u32;

    /// Encode the presently active alternative at its field number. The
    /// active alternative is always written, even with a default payload,
    /// so the selection survives the round trip.
    fn encode_oneof(&self, base: u32, writer: &mut BytesMut);

    /// Decode the alternative addressed by `number` and make it active,
    /// discarding any previously active alternative.
    fn merge_oneof(
        &mut self,
        number: u32,
        base: u32,
        wire_type: WireType,
        reader: &mut Bytes,
        depth: usize,
    ) -> Result<()>;

    /// The byte length `encode_oneof` would produce.
    fn oneof_size(&self, base: u32) -> usize;
}

/// Encode a value to bytes. Never fails; the output buffer is preallocated
/// to the exact size reported by [`Message::encoded_size`].
///
/// # Example
/// ```rust
/// use protoflect::{to_bytes, from_bytes, Message};
///
/// #[derive(Message, Default, PartialEq, Debug)]
/// struct MyStruct {
///     id: u32,
///     name: String,
/// }
///
/// let value = MyStruct { id: 42, name: "hello".to_string() };
/// let buf = to_bytes(&value);
/// let decoded: MyStruct = from_bytes(buf).unwrap();
/// assert_eq!(value, decoded);
/// ```
pub fn to_bytes<T: Message>(value: &T) -> Bytes {
    let mut writer = BytesMut::with_capacity(value.encoded_size());
    value.encode_raw(&mut writer);
    writer.freeze()
}

/// Decode a value from bytes into a default-constructed `T`.
///
/// The whole buffer is consumed. Unknown field numbers are skipped; any
/// malformed record aborts the decode with an error.
pub fn from_bytes<T: Message + Default>(mut buf: Bytes) -> Result<T> {
    let mut value = T::default();
    value.merge(&mut buf, 0)?;
    Ok(value)
}

/// Decode bytes into an existing value, merging per proto3 semantics:
/// scalars overwrite, repeated fields append, nested messages merge.
pub fn merge_from_bytes<T: Message>(value: &mut T, mut buf: Bytes) -> Result<()> {
    value.merge(&mut buf, 0)
}

/// The exact serialized byte length of `value`, for callers wishing to
/// preallocate. Always equals `to_bytes(value).len()`.
pub fn encoded_size<T: Message>(value: &T) -> usize {
    value.encoded_size()
}
