//! Reference table behavior: sharing, back-references, cycles, simple mode.

use std::cell::RefCell;
use std::rc::Rc;

use bytes::Bytes;
use graphpack::{decode, decode_simple, encode, encode_simple, CodecError, Encoder, Value};

#[test]
fn test_shared_string_emits_a_back_reference() {
    let s: Rc<str> = Rc::from("ab");
    let list = Value::list(vec![Value::Str(s.clone()), Value::Str(s)]);
    let buf = encode(&list).unwrap();
    // list claims slot 0 before its children; the string is slot 1
    assert_eq!(&buf[..], b"a2{s2\"ab\"r1;}");
}

#[test]
fn test_decoded_sharing_is_preserved() {
    let decoded: Value = decode(Bytes::from_static(b"a2{s2\"ab\"r1;}")).unwrap();
    let Value::List(list) = decoded else {
        panic!("expected a list");
    };
    let items = list.borrow();
    match (&items[0], &items[1]) {
        (Value::Str(a), Value::Str(b)) => {
            assert_eq!(a.as_ref(), "ab");
            assert!(Rc::ptr_eq(a, b), "sharing was lost");
        }
        other => panic!("expected two strings, got {:?}", other),
    }
}

#[test]
fn test_typed_destinations_resolve_string_references() {
    let decoded: Vec<String> = decode(Bytes::from_static(b"a2{s2\"ab\"r1;}")).unwrap();
    assert_eq!(decoded, vec!["ab".to_string(), "ab".to_string()]);
}

#[test]
fn test_reference_indices_increment_in_emission_order() {
    let a: Rc<str> = Rc::from("ab");
    let b: Rc<str> = Rc::from("cd");
    let list = Value::list(vec![
        Value::Str(a.clone()),
        Value::Str(b.clone()),
        Value::Str(a),
        Value::Str(b),
    ]);
    let buf = encode(&list).unwrap();
    assert_eq!(&buf[..], b"a4{s2\"ab\"s2\"cd\"r1;r2;}");
}

#[test]
fn test_self_referential_list_roundtrips() {
    let inner = Rc::new(RefCell::new(Vec::new()));
    inner.borrow_mut().push(Value::List(inner.clone()));
    let buf = encode(&Value::List(inner)).unwrap();
    assert_eq!(&buf[..], b"a1{r0;}");

    let decoded: Value = decode(buf).unwrap();
    let Value::List(outer) = decoded else {
        panic!("expected a list");
    };
    let first = outer.borrow()[0].clone();
    let Value::List(first) = first else {
        panic!("expected the element to be a list");
    };
    assert!(Rc::ptr_eq(&outer, &first), "cycle was not preserved");
}

#[test]
fn test_shared_byte_arrays_deduplicate() {
    let bytes: Rc<[u8]> = Rc::from(&b"payload"[..]);
    let list = Value::list(vec![Value::Bytes(bytes.clone()), Value::Bytes(bytes)]);
    let buf = encode(&list).unwrap();
    assert_eq!(&buf[..], b"a2{b7\"payload\"r1;}");
}

#[test]
fn test_empty_list_still_consumes_a_slot() {
    // slots: outer 0, empty inner 1, string 2; the repeated string is r2;
    let s: Rc<str> = Rc::from("ab");
    let list = Value::list(vec![
        Value::list(vec![]),
        Value::Str(s.clone()),
        Value::Str(s),
    ]);
    let buf = encode(&list).unwrap();
    assert_eq!(&buf[..], b"a3{a{}s2\"ab\"r2;}");
}

#[test]
fn test_reference_out_of_range_is_an_error() {
    let err = decode::<Value>(Bytes::from_static(b"r5;")).unwrap_err();
    assert!(matches!(err, CodecError::RefOutOfRange { index: 5, len: 0 }));
}

#[test]
fn test_references_into_typed_containers_are_unresolved() {
    // slot 1 is consumed by the typed inner Vec and not retained
    let err = decode::<Vec<Vec<i64>>>(Bytes::from_static(b"a2{a1{1}r1;}")).unwrap_err();
    assert!(matches!(err, CodecError::Format(_)));

    // the dynamic path retains everything
    let decoded: Value = decode(Bytes::from_static(b"a2{a1{1}r1;}")).unwrap();
    let Value::List(outer) = decoded else {
        panic!("expected a list");
    };
    let items = outer.borrow();
    match (&items[0], &items[1]) {
        (Value::List(a), Value::List(b)) => assert!(Rc::ptr_eq(a, b)),
        other => panic!("expected two lists, got {:?}", other),
    }
}

#[test]
fn test_simple_mode_writes_everything_in_full() {
    let s: Rc<str> = Rc::from("ab");
    let list = Value::list(vec![Value::Str(s.clone()), Value::Str(s)]);
    let buf = encode_simple(&list).unwrap();
    assert_eq!(&buf[..], b"a2{s2\"ab\"s2\"ab\"}");
}

#[test]
fn test_simple_mode_rejects_back_references() {
    let err = decode_simple::<Value>(Bytes::from_static(b"a2{s2\"ab\"r1;}")).unwrap_err();
    assert!(matches!(err, CodecError::Format(_)));
}

#[test]
fn test_finish_resets_reference_indices() {
    let s: Rc<str> = Rc::from("ab");
    let list = Value::list(vec![Value::Str(s.clone()), Value::Str(s)]);

    let mut enc = Encoder::new();
    enc.encode(&list).unwrap();
    let first = enc.finish();
    enc.encode(&list).unwrap();
    let second = enc.finish();
    assert_eq!(first, second);
}

#[test]
fn test_multiple_top_level_values_share_one_table() {
    let s = "hello".to_string();
    let mut enc = Encoder::new();
    enc.encode(&s).unwrap();
    enc.encode(&s).unwrap();
    assert_eq!(enc.bytes(), b"s5\"hello\"r0;");
}
