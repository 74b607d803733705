//! Round-trip properties over the typed codecs.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use graphpack::{decode, encode};
use proptest::prelude::*;

fn roundtrip<T>(value: T)
where
    T: graphpack::Encode + graphpack::Decode + PartialEq + std::fmt::Debug,
{
    let buf = encode(&value).unwrap();
    let back: T = decode(buf).unwrap();
    assert_eq!(value, back);
}

#[test]
fn test_integer_extremes() {
    roundtrip(0u8);
    roundtrip(u8::MAX);
    roundtrip(i8::MIN);
    roundtrip(i16::MIN);
    roundtrip(u16::MAX);
    roundtrip(i32::MIN);
    roundtrip(i32::MAX);
    roundtrip(u32::MAX);
    roundtrip(i64::MIN);
    roundtrip(i64::MAX);
    roundtrip(u64::MAX);
    roundtrip(usize::MAX);
    roundtrip(isize::MIN);
}

#[test]
fn test_float_specials() {
    roundtrip(0.0f64);
    roundtrip(-0.0f64);
    roundtrip(f64::MIN_POSITIVE);
    roundtrip(f64::MAX);
    roundtrip(f64::INFINITY);
    roundtrip(f64::NEG_INFINITY);
    roundtrip(f32::MAX);
    roundtrip(f32::MIN_POSITIVE);
    let nan: f64 = decode(encode(&f64::NAN).unwrap()).unwrap();
    assert!(nan.is_nan());
}

#[test]
fn test_strings_and_chars() {
    roundtrip(String::new());
    roundtrip("a".to_string());
    roundtrip("hello world".to_string());
    roundtrip("\u{00E9}\u{6C49}\u{1F600}".to_string());
    roundtrip('x');
    roundtrip('\u{00E9}');
    roundtrip('\u{6C49}');
    roundtrip('\u{1F600}');
}

#[test]
fn test_collections() {
    roundtrip(vec![1i64, -5, 1_000_000, i64::MIN]);
    roundtrip(Vec::<i64>::new());
    roundtrip(vec!["one".to_string(), String::new(), "three".to_string()]);
    roundtrip(vec![vec![1i32], vec![], vec![2, 3]]);
    roundtrip(vec![0u8, 1, 255]);
    roundtrip([7i32, 8, 9]);
    roundtrip(Some("maybe".to_string()));
    roundtrip(Option::<String>::None);
    roundtrip(vec![Some(1i32), None, Some(3)]);

    let mut hash = HashMap::new();
    hash.insert("k".to_string(), 1i64);
    hash.insert("key2".to_string(), -2);
    roundtrip(hash);

    let mut tree = BTreeMap::new();
    tree.insert(1i32, vec![true]);
    tree.insert(2, vec![false, true]);
    roundtrip(tree);
}

#[test]
fn test_boxed_values() {
    roundtrip(Box::new(42i64));
    roundtrip(std::rc::Rc::new("shared".to_string()));
    roundtrip(std::sync::Arc::new(vec![1u32, 2]));
}

#[test]
fn test_bytes_roundtrip_is_zero_copy_on_decode() {
    let input = encode(&Bytes::from_static(b"payload")).unwrap();
    let base = input.as_ptr() as usize;
    let out: Bytes = decode(input).unwrap();
    assert_eq!(&out[..], b"payload");
    let ptr = out.as_ptr() as usize;
    assert!(ptr >= base && ptr < base + 16, "decode copied the payload");
}

#[cfg(feature = "complex")]
#[test]
fn test_complex_numbers() {
    use num_complex::Complex;
    roundtrip(Complex::new(1.5f64, -2.5));
    roundtrip(Complex::new(3.25f32, 0.5));
    // zero imaginary part collapses to the real float
    assert_eq!(encode(&Complex::new(2.5f64, 0.0)).unwrap(), encode(&2.5f64).unwrap());
    roundtrip(Complex::new(2.5f64, 0.0));
}

#[cfg(feature = "uuid")]
#[test]
fn test_uuids() {
    roundtrip(uuid::Uuid::nil());
    for _ in 0..8 {
        roundtrip(uuid::Uuid::new_v4());
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 512, ..ProptestConfig::default() })]

    #[test]
    fn test_roundtrip_i64(v in proptest::num::i64::ANY) {
        let back: i64 = decode(encode(&v).unwrap()).unwrap();
        prop_assert_eq!(v, back);
    }

    #[test]
    fn test_roundtrip_u64(v in proptest::num::u64::ANY) {
        let back: u64 = decode(encode(&v).unwrap()).unwrap();
        prop_assert_eq!(v, back);
    }

    #[test]
    fn test_roundtrip_f64_bit_exact(v in proptest::num::f64::ANY) {
        let back: f64 = decode(encode(&v).unwrap()).unwrap();
        if v.is_nan() {
            prop_assert!(back.is_nan());
        } else {
            prop_assert_eq!(v.to_bits(), back.to_bits());
        }
    }

    #[test]
    fn test_roundtrip_f32_bit_exact(v in proptest::num::f32::ANY) {
        let back: f32 = decode(encode(&v).unwrap()).unwrap();
        if v.is_nan() {
            prop_assert!(back.is_nan());
        } else {
            prop_assert_eq!(v.to_bits(), back.to_bits());
        }
    }

    #[test]
    fn test_roundtrip_string(v in any::<String>()) {
        let back: String = decode(encode(&v).unwrap()).unwrap();
        prop_assert_eq!(v, back);
    }

    #[test]
    fn test_roundtrip_byte_vec(v in any::<Vec<u8>>()) {
        let back: Vec<u8> = decode(encode(&v).unwrap()).unwrap();
        prop_assert_eq!(v, back);
    }

    #[test]
    fn test_roundtrip_string_vec(v in proptest::collection::vec(any::<String>(), 0..8)) {
        let back: Vec<String> = decode(encode(&v).unwrap()).unwrap();
        prop_assert_eq!(v, back);
    }
}
