//! Dynamic values, structural decoding, the registry and simple mode.

use std::any::TypeId;

use bytes::Bytes;
use graphpack::{decode, encode, CodecError, Decode, Decoder, Encode, Encoder, Value};

#[test]
fn test_structural_decode_of_primitives() {
    assert_eq!(decode::<Value>(Bytes::from_static(b"7")).unwrap(), Value::Int(7));
    assert_eq!(
        decode::<Value>(Bytes::from_static(b"i42;")).unwrap(),
        Value::Int(42)
    );
    assert_eq!(
        decode::<Value>(Bytes::from_static(b"d2.5;")).unwrap(),
        Value::Double(2.5)
    );
    assert_eq!(decode::<Value>(Bytes::from_static(b"t")).unwrap(), Value::Bool(true));
    assert_eq!(decode::<Value>(Bytes::from_static(b"n")).unwrap(), Value::Null);
    assert_eq!(
        decode::<Value>(Bytes::from_static(b"e")).unwrap(),
        Value::from("")
    );
    assert_eq!(
        decode::<Value>(Bytes::from_static(b"ux")).unwrap(),
        Value::from("x")
    );
    assert_eq!(
        decode::<Value>(Bytes::from_static(b"s2\"hi\"")).unwrap(),
        Value::from("hi")
    );
}

#[test]
fn test_value_graphs_roundtrip() {
    let value = Value::list(vec![
        Value::Int(1),
        Value::from("two"),
        Value::map(vec![(Value::from("k"), Value::Bool(false))]),
        Value::Null,
        Value::Double(0.5),
    ]);
    let buf = encode(&value).unwrap();
    let back: Value = decode(buf).unwrap();
    assert_eq!(value, back);
}

#[test]
fn test_map_values_keep_pair_order_on_decode() {
    let value = Value::map(vec![
        (Value::Int(1), Value::from("one")),
        (Value::Int(2), Value::from("two")),
    ]);
    let buf = encode(&value).unwrap();
    assert_eq!(&buf[..], b"m2{1s3\"one\"2s3\"two\"}");
    let back: Value = decode(buf).unwrap();
    assert_eq!(value, back);
}

#[test]
fn test_error_values_roundtrip() {
    let value = Value::Error(std::rc::Rc::from("boom"));
    let buf = encode(&value).unwrap();
    assert_eq!(&buf[..], b"Es4\"boom\"");
    let back: Value = decode(buf).unwrap();
    assert_eq!(value, back);
}

#[test]
fn test_error_message_consumes_a_reference_slot() {
    let mut enc = Encoder::new();
    enc.encode(&Value::Error(std::rc::Rc::from("boom"))).unwrap();
    let s = "next".to_string();
    enc.encode(&s).unwrap();
    enc.encode(&s).unwrap();
    // error message occupied slot 0, so the shared string is slot 1
    assert_eq!(enc.bytes(), b"Es4\"boom\"s4\"next\"r1;");
}

#[cfg(feature = "uuid")]
#[test]
fn test_uuid_values_roundtrip() {
    let id = uuid::Uuid::new_v4();
    let buf = encode(&Value::Uuid(id)).unwrap();
    let back: Value = decode(buf).unwrap();
    assert_eq!(back, Value::Uuid(id));
}

#[test]
fn test_decode_any_dispatches_registered_types() {
    let mut dec = Decoder::new(Bytes::from_static(b"i42;"));
    let boxed = dec.decode_any(TypeId::of::<i64>()).unwrap();
    assert_eq!(*boxed.downcast::<i64>().unwrap(), 42);
}

#[test]
fn test_decode_any_falls_back_to_value() {
    struct Unregistered;
    let mut dec = Decoder::new(Bytes::from_static(b"a2{12}"));
    let boxed = dec.decode_any(TypeId::of::<Unregistered>()).unwrap();
    let value = boxed.downcast::<Value>().unwrap();
    assert_eq!(*value, Value::list(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn test_encode_any_dispatches_registered_types() {
    let mut enc = Encoder::new();
    enc.encode_any(&42i64).unwrap();
    enc.encode_any(&"hi".to_string()).unwrap();
    assert_eq!(enc.bytes(), b"i42;s2\"hi\"");
}

#[test]
fn test_encode_any_rejects_unregistered_types() {
    struct Blob;
    let mut enc = Encoder::new();
    let err = enc.encode_any(&Blob).unwrap_err();
    assert!(matches!(err, CodecError::Unregistered(_)));
}

#[test]
fn test_registry_accepts_user_records() {
    #[derive(Encode, Decode, PartialEq, Debug)]
    struct Custom {
        value: i64,
    }
    graphpack::register::<Custom>();
    let mut enc = Encoder::new();
    enc.encode_any(&Custom { value: 9 }).unwrap();
    let buf = enc.finish();
    let back: Custom = decode(buf).unwrap();
    assert_eq!(back, Custom { value: 9 });
    graphpack::unregister::<Custom>();
}

#[test]
fn test_simple_mode_strings_are_zero_copy() {
    let input = Bytes::from_static(b"s5\"hello\"");
    let base = input.as_ptr() as usize;
    let mut dec = Decoder::simple(input);
    assert!(dec.is_simple());
    assert_eq!(dec.read_tag().unwrap(), b's');
    let body = dec.read_string_bytes().unwrap();
    assert_eq!(&body[..], b"hello");
    assert_eq!(body.as_ptr() as usize, base + 3, "string body was copied");
}

#[test]
fn test_decoder_reset_clears_state() {
    let mut dec = Decoder::new(Bytes::from_static(b"s2\"ab\"r0;"));
    let first: String = dec.decode().unwrap();
    assert_eq!(first, "ab");
    let second: String = dec.decode().unwrap();
    assert_eq!(second, "ab");

    dec.reset(Bytes::from_static(b"r0;"));
    assert!(dec.decode::<String>().is_err());
}

#[test]
fn test_errors_leave_the_cursor_past_the_offending_bytes() {
    let mut dec = Decoder::new(Bytes::from_static(b"a{}i10;"));
    assert!(dec.decode::<i64>().is_err());
    // only the offending list tag was consumed
    assert_eq!(dec.remaining(), 6);
}
