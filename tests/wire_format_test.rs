use std::collections::BTreeMap;

use protoflect::bytes::{Bytes, BytesMut};
use protoflect::{from_bytes, to_bytes, wire, Fixed32, Fixed64, Message, Sint32, Sint64};

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct Test1 {
    a: i32,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct Test2 {
    a: i32,
    b: String,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct Test3 {
    #[pb(number = 3)]
    c: Test1,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct SignedTest {
    a: Sint32,
    b: Sint64,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct FixedTest {
    a: Fixed32,
    b: Fixed64,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct BoolTest {
    a: bool,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct MapTest {
    #[pb(number = 2)]
    y: BTreeMap<i32, String>,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct Interleaved {
    a: i32,
    #[pb(number = 3)]
    b: i32,
    c: i32,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct Wide {
    x: i32,
    y: String,
    z: f64,
}

#[derive(Message, Default, PartialEq, Debug, Clone)]
struct Narrow {
    x: i32,
}

#[test]
fn test_varint_field_bytes() {
    // The canonical proto example: field 1, varint 150.
    let buf = to_bytes(&Test1 { a: 150 });
    assert_eq!(&buf[..], &[0x08, 0x96, 0x01]);
}

#[test]
fn test_string_field_bytes() {
    // a stays default and is omitted; b is field 2, length-delimited.
    let buf = to_bytes(&Test2 {
        a: 0,
        b: "testing".to_string(),
    });
    assert_eq!(
        &buf[..],
        &[0x12, 0x07, b't', b'e', b's', b't', b'i', b'n', b'g']
    );
}

#[test]
fn test_negative_int32_takes_ten_bytes() {
    let buf = to_bytes(&Test1 { a: -1 });
    assert_eq!(
        &buf[..],
        &[0x08, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
    );
}

#[test]
fn test_zigzag_field_bytes() {
    let buf = to_bytes(&SignedTest {
        a: Sint32(-2),
        b: Sint64(1),
    });
    // zigzag(-2) = 3 at field 1, zigzag(1) = 2 at field 2.
    assert_eq!(&buf[..], &[0x08, 0x03, 0x10, 0x02]);
}

#[test]
fn test_fixed_field_bytes() {
    let buf = to_bytes(&FixedTest {
        a: Fixed32(1),
        b: Fixed64(2),
    });
    assert_eq!(
        &buf[..],
        &[
            0x0d, 0x01, 0x00, 0x00, 0x00, // field 1, fixed32
            0x11, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // field 2, fixed64
        ]
    );
}

#[test]
fn test_bool_field_bytes() {
    let buf = to_bytes(&BoolTest { a: true });
    assert_eq!(&buf[..], &[0x08, 0x01]);
}

#[test]
fn test_nested_message_bytes() {
    // The canonical embedded-message example: field 3 wrapping field 1 = 150.
    let buf = to_bytes(&Test3 {
        c: Test1 { a: 150 },
    });
    assert_eq!(&buf[..], &[0x1a, 0x03, 0x08, 0x96, 0x01]);
}

#[test]
fn test_explicit_numbers_interleave_with_positional() {
    // a takes 1 positionally, b is pinned to 3, c continues at 4.
    let st1 = Interleaved { a: 1, b: 2, c: 3 };
    let buf = to_bytes(&st1);
    assert_eq!(&buf[..], &[0x08, 0x01, 0x18, 0x02, 0x20, 0x03]);
    let st2: Interleaved = from_bytes(buf).unwrap();
    assert_eq!(st1, st2);
}

#[test]
fn test_map_entry_bytes() {
    let buf = to_bytes(&MapTest {
        y: BTreeMap::from([(1, "test".to_string())]),
    });
    // Entry = submessage with key at 1, value at 2, under field 2.
    assert_eq!(
        &buf[..],
        &[0x12, 0x08, 0x08, 0x01, 0x12, 0x04, b't', b'e', b's', b't']
    );
}

#[test]
fn test_map_encode_order_is_deterministic() {
    let forward = MapTest {
        y: BTreeMap::from([(1, "test".to_string()), (2, "ok".to_string())]),
    };
    let mut reversed = MapTest::default();
    reversed.y.insert(2, "ok".to_string());
    reversed.y.insert(1, "test".to_string());
    assert_eq!(to_bytes(&forward), to_bytes(&reversed));
}

#[test]
fn test_unknown_fields_are_skipped() {
    // Wide has string and double fields Narrow knows nothing about.
    let wide = Wide {
        x: 42,
        y: "extra".to_string(),
        z: 2.5,
    };
    let narrow: Narrow = from_bytes(to_bytes(&wide)).unwrap();
    assert_eq!(narrow.x, 42);
}

#[test]
fn test_unknown_fields_of_every_wire_type() {
    let mut buf = BytesMut::new();
    // Unknown varint at 10, fixed64 at 11, length-delimited at 12, fixed32 at 13.
    wire::encode_key(10, wire::WireType::Varint, &mut buf);
    wire::encode_varint(300, &mut buf);
    wire::encode_key(11, wire::WireType::Fixed64, &mut buf);
    buf.extend_from_slice(&7u64.to_le_bytes());
    wire::encode_key(12, wire::WireType::LengthDelimited, &mut buf);
    wire::encode_varint(3, &mut buf);
    buf.extend_from_slice(b"abc");
    wire::encode_key(13, wire::WireType::Fixed32, &mut buf);
    buf.extend_from_slice(&9u32.to_le_bytes());
    // Then the known field.
    wire::encode_key(1, wire::WireType::Varint, &mut buf);
    wire::encode_varint(42, &mut buf);

    let narrow: Narrow = from_bytes(buf.freeze()).unwrap();
    assert_eq!(narrow.x, 42);
}

#[test]
fn test_varint_primitives() {
    fn encoded(value: u64) -> Bytes {
        let mut buf = BytesMut::new();
        wire::encode_varint(value, &mut buf);
        buf.freeze()
    }

    assert_eq!(&encoded(0)[..], &[0x00]);
    assert_eq!(&encoded(127)[..], &[0x7f]);
    assert_eq!(&encoded(128)[..], &[0x80, 0x01]);
    assert_eq!(&encoded(300)[..], &[0xac, 0x02]);
    assert_eq!(encoded(u64::MAX).len(), 10);

    for value in [0u64, 1, 127, 128, 300, 1 << 21, u64::MAX] {
        let mut buf = encoded(value);
        assert_eq!(wire::varint_len(value), buf.len());
        assert_eq!(wire::decode_varint(&mut buf).unwrap(), value);
    }
}

#[test]
fn test_zigzag_primitives() {
    assert_eq!(wire::zigzag32(0), 0);
    assert_eq!(wire::zigzag32(-1), 1);
    assert_eq!(wire::zigzag32(1), 2);
    assert_eq!(wire::zigzag32(-2), 3);
    assert_eq!(wire::zigzag32(i32::MAX), u32::MAX - 1);
    assert_eq!(wire::zigzag32(i32::MIN), u32::MAX);

    for n in [0i32, 1, -1, 2, -2, i32::MAX, i32::MIN] {
        assert_eq!(wire::unzigzag32(wire::zigzag32(n)), n);
    }
    for n in [0i64, 1, -1, 63, -64, i64::MAX, i64::MIN] {
        assert_eq!(wire::unzigzag64(wire::zigzag64(n)), n);
    }
}

#[test]
fn test_key_primitives() {
    let mut buf = BytesMut::new();
    wire::encode_key(5, wire::WireType::Fixed64, &mut buf);
    assert_eq!(&buf[..], &[0x29]);
    assert_eq!(wire::key_len(5), 1);
    // Field numbers above 15 need a second tag byte.
    assert_eq!(wire::key_len(16), 2);

    let mut reader = buf.freeze();
    let (number, wire_type) = wire::decode_key(&mut reader).unwrap();
    assert_eq!(number, 5);
    assert_eq!(wire_type, wire::WireType::Fixed64);

    // The protobuf ceiling is a valid field number.
    let mut buf = BytesMut::new();
    wire::encode_key(wire::MAX_FIELD_NUMBER, wire::WireType::Varint, &mut buf);
    let mut reader = buf.freeze();
    assert_eq!(
        wire::decode_key(&mut reader).unwrap(),
        (wire::MAX_FIELD_NUMBER, wire::WireType::Varint)
    );
}
