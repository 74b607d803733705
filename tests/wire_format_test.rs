//! Byte-level assertions against the wire grammar.

use std::collections::HashMap;

use bytes::Bytes;
use graphpack::{decode, encode};

fn wire<T: graphpack::Encode>(value: &T) -> Vec<u8> {
    encode(value).unwrap().to_vec()
}

#[test]
fn test_digits_encode_as_a_single_byte() {
    for v in 0..=9u8 {
        let expected = vec![b'0' + v];
        assert_eq!(wire(&v), expected);
        assert_eq!(wire(&(v as i16)), expected);
        assert_eq!(wire(&(v as i32)), expected);
        assert_eq!(wire(&(v as i64)), expected);
        assert_eq!(wire(&(v as u64)), expected);
        assert_eq!(wire(&(v as usize)), expected);
    }
}

#[test]
fn test_integers_frame_with_tag_and_semicolon() {
    assert_eq!(wire(&10i32), b"i10;");
    assert_eq!(wire(&-1i32), b"i-1;");
    assert_eq!(wire(&i32::MAX), b"i2147483647;");
    assert_eq!(wire(&i32::MIN), b"i-2147483648;");
    assert_eq!(wire(&12345u16), b"i12345;");
}

#[test]
fn test_long_range_switches_to_long_tag() {
    assert_eq!(wire(&2147483648i64), b"l2147483648;");
    assert_eq!(wire(&-2147483649i64), b"l-2147483649;");
    assert_eq!(wire(&4294967295u32), b"l4294967295;");
    assert_eq!(wire(&u64::MAX), b"l18446744073709551615;");
    assert_eq!(wire(&i64::MIN), b"l-9223372036854775808;");
    // still in 32-bit range, still `i`
    assert_eq!(wire(&2147483647i64), b"i2147483647;");
}

#[test]
fn test_floats() {
    assert_eq!(wire(&3.14f64), b"d3.14;");
    assert_eq!(wire(&3.14f32), b"d3.14;");
    assert_eq!(wire(&0.0f64), b"d0;");
    assert_eq!(wire(&f64::NAN), b"N");
    assert_eq!(wire(&f64::INFINITY), b"I+");
    assert_eq!(wire(&f64::NEG_INFINITY), b"I-");
    assert_eq!(wire(&f32::NAN), b"N");
}

#[test]
fn test_booleans_and_null() {
    assert_eq!(wire(&true), b"t");
    assert_eq!(wire(&false), b"f");
    assert_eq!(wire(&Option::<i32>::None), b"n");
    assert_eq!(wire(&Some(5i32)), b"5");
}

#[test]
fn test_string_ladder() {
    assert_eq!(wire(&String::new()), b"e");
    assert_eq!(wire(&"a".to_string()), b"ua");
    assert_eq!(wire(&"hi".to_string()), b"s2\"hi\"");
    // one code point, two UTF-16 units: framed, with the UTF-8 bytes verbatim
    assert_eq!(wire(&"\u{1F600}".to_string()), b"s2\"\xF0\x9F\x98\x80\"");
    // three CJK characters are three code units
    assert_eq!(
        wire(&"\u{6C49}\u{5B57}\u{6F22}".to_string()),
        b"s3\"\xE6\xB1\x89\xE5\xAD\x97\xE6\xBC\xA2\""
    );
}

#[test]
fn test_chars() {
    assert_eq!(wire(&'A'), b"uA");
    assert_eq!(wire(&'0'), b"u0");
    assert_eq!(wire(&'\u{00E9}'), b"u\xC3\xA9");
    // beyond the BMP a char is a two-unit string
    assert_eq!(wire(&'\u{1F600}'), b"s2\"\xF0\x9F\x98\x80\"");
}

#[test]
fn test_byte_arrays() {
    assert_eq!(wire(&vec![1u8, 2]), b"b2\"\x01\x02\"");
    assert_eq!(wire(&Vec::<u8>::new()), b"b\"\"");
    assert_eq!(wire(&Bytes::from_static(b"xyz")), b"b3\"xyz\"");
}

#[test]
fn test_sequences() {
    assert_eq!(wire(&vec![1i32, 2, 3]), b"a3{123}");
    assert_eq!(wire(&Vec::<i32>::new()), b"a{}");
    assert_eq!(wire(&vec![10i32, 11]), b"a2{i10;i11;}");
    assert_eq!(wire(&[true, false]), b"a2{tf}");
}

#[test]
fn test_maps() {
    let mut map = HashMap::new();
    map.insert(1i32, "ok".to_string());
    assert_eq!(wire(&map), b"m1{1s2\"ok\"}");
    assert_eq!(wire(&HashMap::<i32, i32>::new()), b"m{}");
}

#[cfg(feature = "uuid")]
#[test]
fn test_uuid_frames_as_hyphenated_hex() {
    let id = uuid::Uuid::nil();
    assert_eq!(
        wire(&id),
        b"g{00000000-0000-0000-0000-000000000000}"
    );
}

#[test]
fn test_decode_accepts_numeric_coercions() {
    assert_eq!(decode::<i64>(Bytes::from_static(b"i10;")).unwrap(), 10);
    assert_eq!(decode::<i64>(Bytes::from_static(b"t")).unwrap(), 1);
    assert_eq!(decode::<i64>(Bytes::from_static(b"e")).unwrap(), 0);
    assert_eq!(decode::<i64>(Bytes::from_static(b"d3.9;")).unwrap(), 3);
    assert_eq!(decode::<i32>(Bytes::from_static(b"u7")).unwrap(), 7);
    assert_eq!(decode::<i32>(Bytes::from_static(b"s2\"42\"")).unwrap(), 42);
    assert_eq!(decode::<u8>(Bytes::from_static(b"7")).unwrap(), 7);
    assert!(decode::<f64>(Bytes::from_static(b"N")).unwrap().is_nan());
    assert_eq!(
        decode::<f64>(Bytes::from_static(b"I-")).unwrap(),
        f64::NEG_INFINITY
    );
    assert_eq!(decode::<String>(Bytes::from_static(b"7")).unwrap(), "7");
    assert_eq!(decode::<String>(Bytes::from_static(b"i42;")).unwrap(), "42");
    assert_eq!(decode::<bool>(Bytes::from_static(b"s4\"true\"")).unwrap(), true);
}

#[test]
fn test_decode_range_checks_narrow_destinations() {
    assert!(decode::<u8>(Bytes::from_static(b"i300;")).is_err());
    assert!(decode::<i8>(Bytes::from_static(b"i-300;")).is_err());
    assert!(decode::<u32>(Bytes::from_static(b"i-1;")).is_err());
}

#[test]
fn test_tag_mismatch_names_the_destination() {
    let err = decode::<i64>(Bytes::from_static(b"a{}")).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("i64"), "unexpected message: {}", text);
    assert!(text.contains("'a'"), "unexpected message: {}", text);
}
