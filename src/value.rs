//! Dynamic values.
//!
//! [`Value`] is the structural fallback for streams decoded without a
//! concrete destination type, and the only carrier that preserves full
//! sharing: every referenceable emission decoded through `Value` lands in
//! the reference list, so back-references — including cycles — resolve to
//! the same allocation.

use std::cell::RefCell;
use std::rc::Rc;

use crate::decoder::ClassSchema;
use crate::encoder::ClassKey;
use crate::tags::*;
use crate::{CodecError, Decode, Decoder, Encode, Encoder, RefKey, Result};

/// A record instance: its declared schema plus field values in declared
/// order.
#[derive(Debug, Clone)]
pub struct ObjectValue {
    pub class: Rc<ClassSchema>,
    pub fields: Vec<Value>,
}

/// A dynamically typed value graph.
///
/// Composites are `Rc`-backed so decoded sharing survives and cyclic graphs
/// are representable; interior mutability is what lets a list contain
/// itself.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    #[cfg(feature = "bignum")]
    BigInt(num_bigint::BigInt),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<Vec<(Value, Value)>>>),
    Object(Rc<RefCell<ObjectValue>>),
    Error(Rc<str>),
}

impl Value {
    /// Wraps a vector in a list value.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Wraps key/value pairs in a map value. Pairs keep insertion order; the
    /// wire format does not require any particular order.
    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        Value::Map(Rc::new(RefCell::new(pairs)))
    }

    /// Builds an object value from a schema and field values.
    pub fn object(class: Rc<ClassSchema>, fields: Vec<Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(ObjectValue { class, fields })))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Rc<RefCell<Vec<Value>>>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

/// Structural equality. Composites compare by pointer first, so a value is
/// always equal to itself even when cyclic; comparing two *distinct*
/// structurally equal cyclic graphs does not terminate, like any deep
/// equality over unshared cycles.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            #[cfg(feature = "bignum")]
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            #[cfg(feature = "uuid")]
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => {
                Rc::ptr_eq(a, b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.class.name == b.class.name && a.fields == b.fields
                }
            }
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl Encode for Value {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Value::Null => enc.write_null(),
            Value::Bool(b) => enc.write_bool(*b),
            Value::Int(i) => enc.write_i64(*i),
            Value::Double(f) => enc.write_f64(*f),
            #[cfg(feature = "bignum")]
            Value::BigInt(b) => b.encode(enc),
            Value::Str(s) => enc.encode_str(s),
            Value::Bytes(b) => {
                let key = if b.is_empty() {
                    None
                } else {
                    Some(RefKey::of_slice(&b[..]))
                };
                enc.encode_bytes_keyed(key, &b[..])
            }
            #[cfg(feature = "uuid")]
            Value::Uuid(u) => u.encode(enc),
            Value::List(list) => {
                let key = RefKey::of_ref(&**list);
                if enc.write_reference(key)? {
                    return Ok(());
                }
                enc.set_reference(key);
                let items = list.borrow();
                enc.write_head(TAG_LIST, items.len())?;
                for item in items.iter() {
                    item.encode(enc)?;
                }
                enc.write_foot()
            }
            Value::Map(map) => {
                let key = RefKey::of_ref(&**map);
                if enc.write_reference(key)? {
                    return Ok(());
                }
                enc.set_reference(key);
                let pairs = map.borrow();
                enc.write_head(TAG_MAP, pairs.len())?;
                for (k, v) in pairs.iter() {
                    k.encode(enc)?;
                    v.encode(enc)?;
                }
                enc.write_foot()
            }
            Value::Object(object) => {
                let key = RefKey::of_ref(&**object);
                if enc.write_reference(key)? {
                    return Ok(());
                }
                let obj = object.borrow();
                let schema = &obj.class;
                if obj.fields.len() != schema.fields.len() {
                    return Err(CodecError::ClassMismatch {
                        class: schema.name.clone(),
                        detail: format!(
                            "schema declares {} fields, object carries {}",
                            schema.fields.len(),
                            obj.fields.len()
                        ),
                    });
                }
                let names: Vec<&str> = schema.fields.iter().map(|f| f.as_ref()).collect();
                let index =
                    enc.declare_class(ClassKey::Name(schema.name.clone()), &schema.name, &names)?;
                enc.set_reference(key);
                enc.write_object_head(index)?;
                for field in obj.fields.iter() {
                    field.encode(enc)?;
                }
                enc.write_foot()
            }
            Value::Error(message) => {
                enc.put_u8(TAG_ERROR);
                enc.add_reference_count(1);
                let units = crate::encoder::utf16_len(message.as_bytes()).unwrap_or(0);
                enc.write_str_raw(message, units)
            }
        }
    }
}

impl Decode for Value {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        if let Some(d) = digit_value(tag) {
            return Ok(Value::Int(d as i64));
        }
        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_TRUE => Ok(Value::Bool(true)),
            TAG_FALSE => Ok(Value::Bool(false)),
            TAG_INTEGER => Ok(Value::Int(dec.read_i64_body()?)),
            #[cfg(feature = "bignum")]
            TAG_LONG => {
                let bytes = dec.read_until(TAG_SEMICOLON)?;
                num_bigint::BigInt::parse_bytes(&bytes, 10)
                    .map(Value::BigInt)
                    .ok_or_else(|| {
                        CodecError::Format(format!(
                            "bad integer literal {:?}",
                            String::from_utf8_lossy(&bytes)
                        ))
                    })
            }
            #[cfg(not(feature = "bignum"))]
            TAG_LONG => Ok(Value::Int(dec.read_i64_body()?)),
            TAG_DOUBLE => Ok(Value::Double(dec.read_f64_body()?)),
            TAG_NAN => Ok(Value::Double(f64::NAN)),
            TAG_INFINITY => Ok(Value::Double(dec.read_infinity()?)),
            TAG_EMPTY => Ok(Value::Str(Rc::from(""))),
            TAG_UTF8_CHAR => {
                let c = dec.read_utf8_char()?;
                Ok(Value::Str(Rc::from(c.to_string().as_str())))
            }
            TAG_STRING => Ok(Value::Str(dec.read_string_rc()?)),
            TAG_BYTES => Ok(Value::Bytes(dec.read_bytes_rc()?)),
            #[cfg(feature = "uuid")]
            TAG_GUID => {
                dec.expect_tag(TAG_OPENBRACE)?;
                let text = dec.take(36)?;
                dec.expect_tag(TAG_CLOSEBRACE)?;
                let id = uuid::Uuid::try_parse_ascii(&text)
                    .map_err(|e| CodecError::Format(format!("bad UUID literal: {}", e)))?;
                dec.push_reference(Value::Uuid(id));
                Ok(Value::Uuid(id))
            }
            #[cfg(not(feature = "uuid"))]
            TAG_GUID => Err(CodecError::Format(
                "UUID support is not enabled".to_string(),
            )),
            TAG_LIST => {
                let count = dec.read_len_until(TAG_OPENBRACE)?;
                let list = Rc::new(RefCell::new(Vec::with_capacity(count)));
                dec.push_reference(Value::List(list.clone()));
                for _ in 0..count {
                    let item = Value::decode(dec)?;
                    list.borrow_mut().push(item);
                }
                dec.expect_tag(TAG_CLOSEBRACE)?;
                Ok(Value::List(list))
            }
            TAG_MAP => {
                let count = dec.read_len_until(TAG_OPENBRACE)?;
                let map = Rc::new(RefCell::new(Vec::with_capacity(count)));
                dec.push_reference(Value::Map(map.clone()));
                for _ in 0..count {
                    let k = Value::decode(dec)?;
                    let v = Value::decode(dec)?;
                    map.borrow_mut().push((k, v));
                }
                dec.expect_tag(TAG_CLOSEBRACE)?;
                Ok(Value::Map(map))
            }
            TAG_CLASS => {
                dec.read_class()?;
                Value::decode(dec)
            }
            TAG_OBJECT => {
                let index = dec.read_len_until(TAG_OPENBRACE)?;
                let schema = dec.class_schema(index)?;
                let count = schema.fields.len();
                let object = Rc::new(RefCell::new(ObjectValue {
                    class: schema,
                    fields: Vec::with_capacity(count),
                }));
                dec.push_reference(Value::Object(object.clone()));
                for _ in 0..count {
                    let field = Value::decode(dec)?;
                    object.borrow_mut().fields.push(field);
                }
                dec.expect_tag(TAG_CLOSEBRACE)?;
                Ok(Value::Object(object))
            }
            TAG_REF => dec.read_ref(),
            TAG_ERROR => {
                let tag = dec.read_tag()?;
                let message = match tag {
                    TAG_STRING => dec.read_string_rc()?,
                    TAG_UTF8_CHAR => Rc::from(dec.read_utf8_char()?.to_string().as_str()),
                    TAG_EMPTY => Rc::from(""),
                    tag => {
                        return Err(CodecError::TagMismatch {
                            tag,
                            expected: "error message",
                        })
                    }
                };
                Ok(Value::Error(message))
            }
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "Value",
            }),
        }
    }
}
