use protoflect::bytes::{Bytes, BytesMut};
use protoflect::{from_bytes, to_bytes, wire, CodecError, Enumeration, Fixed64, Message};

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct VarintOnly {
    a: i32,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct StringAt2 {
    a: i32,
    b: String,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct FixedOnly {
    a: Fixed64,
}

#[derive(Enumeration, Clone, Copy, Default, PartialEq, Debug)]
enum Color {
    #[default]
    Red,
    Black,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct WithEnum {
    y: Color,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct Recursive {
    child: Option<Box<Recursive>>,
}

fn bytes(raw: &[u8]) -> Bytes {
    Bytes::copy_from_slice(raw)
}

/// Wraps an empty message in `levels` length-delimited layers at field 1.
fn nested_message_bytes(levels: usize) -> Bytes {
    let mut body = BytesMut::new();
    for _ in 0..levels {
        let mut outer = BytesMut::new();
        wire::encode_key(1, wire::WireType::LengthDelimited, &mut outer);
        wire::encode_varint(body.len() as u64, &mut outer);
        outer.extend_from_slice(&body);
        body = outer;
    }
    body.freeze()
}

#[test]
fn test_varint_ending_mid_sequence() {
    let err = from_bytes::<VarintOnly>(bytes(&[0x08, 0x80])).unwrap_err();
    assert!(matches!(err, CodecError::MalformedVarint));
}

#[test]
fn test_varint_exceeding_ten_bytes() {
    let mut raw = vec![0x08];
    raw.extend(std::iter::repeat(0xff).take(11));
    let err = from_bytes::<VarintOnly>(bytes(&raw)).unwrap_err();
    assert!(matches!(err, CodecError::MalformedVarint));
}

#[test]
fn test_truncated_length_delimited_payload() {
    // Field 2 declares 5 bytes but only 2 remain.
    let err = from_bytes::<StringAt2>(bytes(&[0x12, 0x05, 0x01, 0x02])).unwrap_err();
    assert!(matches!(
        err,
        CodecError::TruncatedPayload {
            declared: 5,
            remaining: 2
        }
    ));
}

#[test]
fn test_truncated_fixed_width_field() {
    let err = from_bytes::<FixedOnly>(bytes(&[0x09, 0x01, 0x02, 0x03])).unwrap_err();
    assert!(matches!(err, CodecError::TruncatedInput));
}

#[test]
fn test_malformed_wire_type() {
    // Wire type 3 (deprecated group start) is not supported.
    let err = from_bytes::<VarintOnly>(bytes(&[0x0b])).unwrap_err();
    assert!(matches!(err, CodecError::MalformedWireType(3)));
}

#[test]
fn test_oversized_field_number_is_rejected() {
    // A 64-bit tag whose field number would truncate to 1 must not alias
    // field 1.
    let mut buf = BytesMut::new();
    wire::encode_varint(((1u64 << 32) | 1) << 3, &mut buf);
    wire::encode_varint(5, &mut buf);
    let err = from_bytes::<VarintOnly>(buf.freeze()).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));

    // Anything past the protobuf ceiling of 2^29 - 1 is rejected too.
    let mut buf = BytesMut::new();
    wire::encode_varint((wire::MAX_FIELD_NUMBER as u64 + 1) << 3, &mut buf);
    wire::encode_varint(5, &mut buf);
    let err = from_bytes::<VarintOnly>(buf.freeze()).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_field_number_zero_is_rejected() {
    let err = from_bytes::<VarintOnly>(bytes(&[0x00, 0x01])).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_wire_type_mismatch_on_known_field() {
    // Field 1 is declared varint but arrives length-delimited.
    let err = from_bytes::<VarintOnly>(bytes(&[0x0a, 0x00])).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_invalid_utf8_string() {
    let err = from_bytes::<StringAt2>(bytes(&[0x12, 0x02, 0xff, 0xfe])).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_unknown_enum_value() {
    let err = from_bytes::<WithEnum>(bytes(&[0x08, 0x05])).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_deep_nesting_is_rejected() {
    let err = from_bytes::<Recursive>(nested_message_bytes(120)).unwrap_err();
    assert!(matches!(
        err,
        CodecError::MaxDepthExceeded(wire::RECURSION_LIMIT)
    ));
}

#[test]
fn test_legitimate_nesting_roundtrips() {
    let mut value = Recursive { child: None };
    for _ in 0..50 {
        value = Recursive {
            child: Some(Box::new(value)),
        };
    }
    let decoded: Recursive = from_bytes(to_bytes(&value)).unwrap();
    assert_eq!(value, decoded);
}

#[test]
fn test_decode_of_crafted_deep_buffer_below_limit() {
    let decoded: Recursive = from_bytes(nested_message_bytes(50)).unwrap();
    let mut depth = 0;
    let mut cursor = &decoded;
    while let Some(child) = &cursor.child {
        depth += 1;
        cursor = child;
    }
    assert_eq!(depth, 50);
}
