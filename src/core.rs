//! Built-in codecs for primitives, strings, byte arrays and collections.
//!
//! Decoders accept the format's full coercion set for each destination kind
//! rather than a single tag, so a stream written with one numeric width can
//! be read back into another as long as the value fits.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;

use crate::decoder::parse_f64;
use crate::tags::*;
use crate::value::Value;
use crate::{CodecError, Decode, Decoder, Encode, Encoder, RefKey, Result};

// --- common decode helpers ---

/// Decodes a signed 64-bit value from any tag the format allows to coerce
/// into an integer destination.
pub(crate) fn read_i64_tag(dec: &mut Decoder, tag: u8, expected: &'static str) -> Result<i64> {
    if let Some(d) = digit_value(tag) {
        return Ok(d as i64);
    }
    match tag {
        TAG_NULL | TAG_EMPTY | TAG_FALSE => Ok(0),
        TAG_TRUE => Ok(1),
        TAG_INTEGER | TAG_LONG => dec.read_i64_body(),
        TAG_DOUBLE => Ok(dec.read_f64_body()? as i64),
        TAG_UTF8_CHAR => {
            let c = dec.read_utf8_char()?;
            c.to_digit(10)
                .map(|d| d as i64)
                .ok_or_else(|| CodecError::Format(format!("character {:?} is not a digit", c)))
        }
        TAG_STRING => {
            let s = dec.read_string_rc()?;
            s.parse()
                .map_err(|_| CodecError::Format(format!("bad integer literal {:?}", s)))
        }
        TAG_REF => match dec.read_ref()? {
            Value::Str(s) => s
                .parse()
                .map_err(|_| CodecError::Format(format!("bad integer literal {:?}", s))),
            _ => Err(CodecError::Format(
                "referenced value is not a number".to_string(),
            )),
        },
        _ => Err(CodecError::TagMismatch { tag, expected }),
    }
}

/// Unsigned counterpart of [`read_i64_tag`].
pub(crate) fn read_u64_tag(dec: &mut Decoder, tag: u8, expected: &'static str) -> Result<u64> {
    if let Some(d) = digit_value(tag) {
        return Ok(d as u64);
    }
    match tag {
        TAG_NULL | TAG_EMPTY | TAG_FALSE => Ok(0),
        TAG_TRUE => Ok(1),
        TAG_INTEGER | TAG_LONG => dec.read_u64_body(),
        TAG_DOUBLE => Ok(dec.read_f64_body()? as u64),
        TAG_UTF8_CHAR => {
            let c = dec.read_utf8_char()?;
            c.to_digit(10)
                .map(|d| d as u64)
                .ok_or_else(|| CodecError::Format(format!("character {:?} is not a digit", c)))
        }
        TAG_STRING => {
            let s = dec.read_string_rc()?;
            s.parse()
                .map_err(|_| CodecError::Format(format!("bad integer literal {:?}", s)))
        }
        TAG_REF => match dec.read_ref()? {
            Value::Str(s) => s
                .parse()
                .map_err(|_| CodecError::Format(format!("bad integer literal {:?}", s))),
            _ => Err(CodecError::Format(
                "referenced value is not a number".to_string(),
            )),
        },
        _ => Err(CodecError::TagMismatch { tag, expected }),
    }
}

/// Decodes an `f64` from any tag the format allows to coerce into a float
/// destination.
pub(crate) fn read_f64_tag(dec: &mut Decoder, tag: u8, expected: &'static str) -> Result<f64> {
    if let Some(d) = digit_value(tag) {
        return Ok(d as f64);
    }
    match tag {
        TAG_NULL | TAG_EMPTY | TAG_FALSE => Ok(0.0),
        TAG_TRUE => Ok(1.0),
        TAG_INTEGER | TAG_LONG | TAG_DOUBLE => dec.read_f64_body(),
        TAG_NAN => Ok(f64::NAN),
        TAG_INFINITY => dec.read_infinity(),
        TAG_UTF8_CHAR => {
            let c = dec.read_utf8_char()?;
            parse_f64(c.to_string().as_bytes())
        }
        TAG_STRING => {
            let s = dec.read_string_rc()?;
            s.parse()
                .map_err(|_| CodecError::Format(format!("bad float literal {:?}", s)))
        }
        TAG_REF => match dec.read_ref()? {
            Value::Str(s) => s
                .parse()
                .map_err(|_| CodecError::Format(format!("bad float literal {:?}", s))),
            _ => Err(CodecError::Format(
                "referenced value is not a number".to_string(),
            )),
        },
        _ => Err(CodecError::TagMismatch { tag, expected }),
    }
}

fn str_to_bool(s: &str) -> Result<bool> {
    match s {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "" => Ok(false),
        _ => Err(CodecError::Format(format!("bad boolean literal {:?}", s))),
    }
}

// --- bool ---

/// Encodes as the bare `t`/`f` tag, no body.
impl Encode for bool {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.write_bool(*self)
    }
}

impl Decode for bool {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        if let Some(d) = digit_value(tag) {
            return Ok(d != 0);
        }
        match tag {
            TAG_TRUE => Ok(true),
            TAG_FALSE | TAG_NULL | TAG_EMPTY => Ok(false),
            TAG_INTEGER | TAG_LONG => Ok(dec.read_i64_body()? != 0),
            TAG_DOUBLE => Ok(dec.read_f64_body()? != 0.0),
            TAG_UTF8_CHAR => {
                let c = dec.read_utf8_char()?;
                str_to_bool(&c.to_string())
            }
            TAG_STRING => {
                let s = dec.read_string_rc()?;
                str_to_bool(&s)
            }
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "bool",
            }),
        }
    }
}

// --- integers ---

/// Integer widths at most 32 bits always frame with `i`; 0..=9 of every
/// width emit as a bare digit byte.
macro_rules! impl_narrow_int {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<()> {
                enc.write_i32(*self as i32)
            }
        }
        impl Decode for $t {
            fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
                let v = read_i64_tag(dec, tag, stringify!($t))?;
                <$t>::try_from(v).map_err(|_| {
                    CodecError::Format(format!(
                        "value {} out of range for {}",
                        v,
                        stringify!($t)
                    ))
                })
            }
        }
    )*};
}

impl_narrow_int!(i8, i16, i32, u8, u16);

/// 64-bit-capable widths pick `i` or `l` from the runtime value.
macro_rules! impl_wide_signed {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<()> {
                enc.write_i64(*self as i64)
            }
        }
        impl Decode for $t {
            fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
                let v = read_i64_tag(dec, tag, stringify!($t))?;
                <$t>::try_from(v).map_err(|_| {
                    CodecError::Format(format!(
                        "value {} out of range for {}",
                        v,
                        stringify!($t)
                    ))
                })
            }
        }
    )*};
}

impl_wide_signed!(i64, isize);

macro_rules! impl_wide_unsigned {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<()> {
                enc.write_u64(*self as u64)
            }
        }
        impl Decode for $t {
            fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
                let v = read_u64_tag(dec, tag, stringify!($t))?;
                <$t>::try_from(v).map_err(|_| {
                    CodecError::Format(format!(
                        "value {} out of range for {}",
                        v,
                        stringify!($t)
                    ))
                })
            }
        }
    )*};
}

impl_wide_unsigned!(u32, u64, usize);

// --- floats ---

/// Finite values frame as `d<shortest>;`, NaN as `N`, infinities as `I+`/`I-`.
impl Encode for f64 {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.write_f64(*self)
    }
}

impl Decode for f64 {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        read_f64_tag(dec, tag, "f64")
    }
}

impl Encode for f32 {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.write_f32(*self)
    }
}

impl Decode for f32 {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        if tag == TAG_DOUBLE {
            // Parse at 32-bit width directly; rounding through f64 first can
            // land on a different f32.
            let bytes = dec.read_until(TAG_SEMICOLON)?;
            return std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| {
                    CodecError::Format(format!(
                        "bad float literal {:?}",
                        String::from_utf8_lossy(&bytes)
                    ))
                });
        }
        Ok(read_f64_tag(dec, tag, "f32")? as f32)
    }
}

// --- char ---

/// A `char` is a one-code-point string: `u` when it fits one UTF-16 unit,
/// otherwise an `s` emission burning a counter slot (a bare `char` has no
/// stable address to key).
impl Encode for char {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut buf = [0u8; 4];
        let s = self.encode_utf8(&mut buf);
        if (*self as u32) < 0x10000 {
            enc.write_utf8_char(s)
        } else {
            enc.add_reference_count(1);
            enc.write_str_raw(s, 2)
        }
    }
}

impl Decode for char {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        if let Some(d) = digit_value(tag) {
            return Ok((b'0' + d) as char);
        }
        match tag {
            TAG_UTF8_CHAR => dec.read_utf8_char(),
            TAG_STRING => {
                let s = dec.read_string_rc()?;
                single_char(&s)
            }
            TAG_REF => match dec.read_ref()? {
                Value::Str(s) => single_char(&s),
                _ => Err(CodecError::Format(
                    "referenced value is not a string".to_string(),
                )),
            },
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "char",
            }),
        }
    }
}

fn single_char(s: &str) -> Result<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(CodecError::Format(format!(
            "expected a single character, found {:?}",
            s
        ))),
    }
}

// --- strings ---

/// The string ladder: `e` for empty, `u` for one code unit, referenceable
/// `s` framing otherwise.
impl Encode for str {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.encode_str(self)
    }
}

impl Encode for String {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.encode_str(self)
    }
}

impl Decode for String {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        if let Some(d) = digit_value(tag) {
            return Ok(((b'0' + d) as char).to_string());
        }
        match tag {
            TAG_NULL | TAG_EMPTY => Ok(String::new()),
            TAG_TRUE => Ok("true".to_string()),
            TAG_FALSE => Ok("false".to_string()),
            TAG_UTF8_CHAR => Ok(dec.read_utf8_char()?.to_string()),
            TAG_INTEGER | TAG_LONG | TAG_DOUBLE => {
                let bytes = dec.read_until(TAG_SEMICOLON)?;
                Ok(std::str::from_utf8(&bytes)
                    .map_err(|_| CodecError::Format("invalid UTF-8 in number body".to_string()))?
                    .to_string())
            }
            TAG_STRING => Ok(dec.read_string_rc()?.as_ref().to_string()),
            TAG_REF => match dec.read_ref()? {
                Value::Str(s) => Ok(s.as_ref().to_string()),
                _ => Err(CodecError::Format(
                    "referenced value is not a string".to_string(),
                )),
            },
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "String",
            }),
        }
    }
}

// --- byte arrays ---

fn slice_key(bytes: &[u8]) -> Option<RefKey> {
    if bytes.is_empty() {
        None
    } else {
        Some(RefKey::of_slice(bytes))
    }
}

/// Zero-copy byte array. Decoding borrows the input buffer via the `bytes`
/// crate's reference counting rather than copying.
impl Encode for Bytes {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.encode_bytes_keyed(slice_key(self), self)
    }
}

impl Decode for Bytes {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        match tag {
            TAG_BYTES => dec.read_bytes_framed(),
            TAG_STRING => dec.read_string_bytes(),
            TAG_NULL | TAG_EMPTY => Ok(Bytes::new()),
            TAG_REF => match dec.read_ref()? {
                Value::Bytes(b) => Ok(Bytes::copy_from_slice(&b[..])),
                Value::Str(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
                _ => Err(CodecError::Format(
                    "referenced value is not a byte array".to_string(),
                )),
            },
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "Bytes",
            }),
        }
    }
}

fn decode_byte_vec(dec: &mut Decoder, tag: u8) -> Result<Vec<u8>> {
    match tag {
        TAG_BYTES => Ok(dec.read_bytes_framed()?.to_vec()),
        TAG_STRING => Ok(dec.read_string_bytes()?.to_vec()),
        TAG_NULL | TAG_EMPTY => Ok(Vec::new()),
        TAG_LIST => {
            let count = dec.read_len_until(TAG_OPENBRACE)?;
            dec.reserve_reference();
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(u8::decode(dec)?);
            }
            dec.expect_tag(TAG_CLOSEBRACE)?;
            Ok(out)
        }
        TAG_REF => match dec.read_ref()? {
            Value::Bytes(b) => Ok(b.to_vec()),
            Value::Str(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(CodecError::Format(
                "referenced value is not a byte array".to_string(),
            )),
        },
        tag => Err(CodecError::TagMismatch {
            tag,
            expected: "Vec<u8>",
        }),
    }
}

// --- sequences ---

/// Sequences frame as `a<count>{...}`; the empty sequence is the literal
/// `a{}` and still consumes a reference slot. Byte slices route to the
/// `bytes` emission instead.
impl<T: Encode + 'static> Encode for [T] {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        if TypeId::of::<T>() == TypeId::of::<u8>() {
            // T is u8, so the cast only forgets the generic parameter.
            let bytes = unsafe { &*(self as *const [T] as *const [u8]) };
            return enc.encode_bytes_keyed(slice_key(bytes), bytes);
        }
        if self.is_empty() {
            enc.add_reference_count(1);
            enc.write_head(TAG_LIST, 0)?;
            return enc.write_foot();
        }
        let key = RefKey::of_slice(self);
        if enc.write_reference(key)? {
            return Ok(());
        }
        self.write(enc)
    }

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        if TypeId::of::<T>() == TypeId::of::<u8>() {
            let bytes = unsafe { &*(self as *const [T] as *const [u8]) };
            match slice_key(bytes) {
                Some(key) => enc.set_reference(key),
                None => enc.add_reference_count(1),
            }
            return enc.write_bytes_raw(bytes);
        }
        if self.is_empty() {
            enc.add_reference_count(1);
            enc.write_head(TAG_LIST, 0)?;
            return enc.write_foot();
        }
        enc.set_reference(RefKey::of_slice(self));
        enc.write_head(TAG_LIST, self.len())?;
        for item in self {
            item.encode(enc)?;
        }
        enc.write_foot()
    }
}

impl<T: Encode + 'static> Encode for Vec<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        <[T] as Encode>::encode(self, enc)
    }

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        <[T] as Encode>::write(self, enc)
    }
}

impl<T: Encode + 'static, const N: usize> Encode for [T; N] {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        <[T] as Encode>::encode(self, enc)
    }
}

impl<T: Decode + 'static> Decode for Vec<T> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        if TypeId::of::<T>() == TypeId::of::<u8>() {
            let bytes = decode_byte_vec(dec, tag)?;
            // T is u8; move the allocation across the generic parameter.
            let mut bytes = std::mem::ManuallyDrop::new(bytes);
            let (ptr, len, cap) = (bytes.as_mut_ptr() as *mut T, bytes.len(), bytes.capacity());
            return Ok(unsafe { Vec::from_raw_parts(ptr, len, cap) });
        }
        match tag {
            TAG_NULL => Ok(Vec::new()),
            TAG_LIST => {
                let count = dec.read_len_until(TAG_OPENBRACE)?;
                dec.reserve_reference();
                let mut out = Vec::with_capacity(count);
                for _ in 0..count {
                    out.push(T::decode(dec)?);
                }
                dec.expect_tag(TAG_CLOSEBRACE)?;
                Ok(out)
            }
            TAG_REF => Err(CodecError::Format(
                "back-references to typed sequences are only supported through Value".to_string(),
            )),
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "sequence",
            }),
        }
    }
}

impl<T: Decode + 'static, const N: usize> Decode for [T; N] {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        let vec: Vec<T> = Vec::decode_tag(dec, tag)?;
        let len = vec.len();
        vec.try_into().map_err(|_| {
            CodecError::Format(format!("sequence length mismatch: expected {}, got {}", N, len))
        })
    }
}

// --- Option ---

/// `None` encodes as the `n` tag; `Some` encodes the inner value directly.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Some(value) => value.encode(enc),
            None => enc.write_null(),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        if tag == TAG_NULL {
            return Ok(None);
        }
        T::decode_tag(dec, tag).map(Some)
    }
}

// --- maps ---

/// Maps frame as `m<count>{k v ...}`; iteration order is whatever the map
/// yields, the decoder does not depend on it.
impl<K: Encode + 'static, V: Encode + 'static> Encode for HashMap<K, V> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let key = RefKey::of_ref(self);
        if enc.write_reference(key)? {
            return Ok(());
        }
        self.write(enc)
    }

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.set_reference(RefKey::of_ref(self));
        enc.write_head(TAG_MAP, self.len())?;
        for (k, v) in self {
            k.encode(enc)?;
            v.encode(enc)?;
        }
        enc.write_foot()
    }
}

impl<K: Decode + Eq + std::hash::Hash, V: Decode> Decode for HashMap<K, V> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        match tag {
            TAG_NULL => Ok(HashMap::new()),
            TAG_MAP => {
                let count = dec.read_len_until(TAG_OPENBRACE)?;
                dec.reserve_reference();
                let mut map = HashMap::with_capacity(count);
                for _ in 0..count {
                    let k = K::decode(dec)?;
                    let v = V::decode(dec)?;
                    map.insert(k, v);
                }
                dec.expect_tag(TAG_CLOSEBRACE)?;
                Ok(map)
            }
            TAG_REF => Err(CodecError::Format(
                "back-references to typed maps are only supported through Value".to_string(),
            )),
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "map",
            }),
        }
    }
}

impl<K: Encode + 'static, V: Encode + 'static> Encode for BTreeMap<K, V> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let key = RefKey::of_ref(self);
        if enc.write_reference(key)? {
            return Ok(());
        }
        self.write(enc)
    }

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.set_reference(RefKey::of_ref(self));
        enc.write_head(TAG_MAP, self.len())?;
        for (k, v) in self {
            k.encode(enc)?;
            v.encode(enc)?;
        }
        enc.write_foot()
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        match tag {
            TAG_NULL => Ok(BTreeMap::new()),
            TAG_MAP => {
                let count = dec.read_len_until(TAG_OPENBRACE)?;
                dec.reserve_reference();
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let k = K::decode(dec)?;
                    let v = V::decode(dec)?;
                    map.insert(k, v);
                }
                dec.expect_tag(TAG_CLOSEBRACE)?;
                Ok(map)
            }
            TAG_REF => Err(CodecError::Format(
                "back-references to typed maps are only supported through Value".to_string(),
            )),
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "map",
            }),
        }
    }
}

// --- pointer-like wrappers ---

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        (*self).encode(enc)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        (**self).encode(enc)
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        Ok(Box::new(T::decode_tag(dec, tag)?))
    }
}

/// `Rc` clones share backing storage, so repeated encodes of the same
/// allocation de-duplicate through the reference table.
impl<T: Encode + ?Sized> Encode for Rc<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        (**self).encode(enc)
    }
}

impl<T: Decode> Decode for Rc<T> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        Ok(Rc::new(T::decode_tag(dec, tag)?))
    }
}

impl<T: Encode + ?Sized> Encode for Arc<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        (**self).encode(enc)
    }
}

impl<T: Decode> Decode for Arc<T> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        Ok(Arc::new(T::decode_tag(dec, tag)?))
    }
}
