//! Read-side machinery: the [`Decoder`], its reference list and class schema
//! list, and the wire-level read primitives.

use std::rc::Rc;

use bytes::{Buf, Bytes};

use crate::tags::*;
use crate::value::Value;
use crate::{CodecError, Decode, Result};

/// A record schema declared in the stream: class name plus ordered field
/// names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSchema {
    pub name: String,
    pub fields: Vec<Rc<str>>,
}

fn ascii_str(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|_| CodecError::Format(format!("invalid UTF-8 in literal {:?}", bytes)))
}

pub(crate) fn parse_i64(bytes: &[u8]) -> Result<i64> {
    ascii_str(bytes)?
        .parse()
        .map_err(|_| CodecError::Format(format!("bad integer literal {:?}", String::from_utf8_lossy(bytes))))
}

pub(crate) fn parse_u64(bytes: &[u8]) -> Result<u64> {
    ascii_str(bytes)?
        .parse()
        .map_err(|_| CodecError::Format(format!("bad integer literal {:?}", String::from_utf8_lossy(bytes))))
}

pub(crate) fn parse_f64(bytes: &[u8]) -> Result<f64> {
    ascii_str(bytes)?
        .parse()
        .map_err(|_| CodecError::Format(format!("bad float literal {:?}", String::from_utf8_lossy(bytes))))
}

/// Reconstructs values from a [`Bytes`] source.
///
/// A `Decoder` owns its reference list and class schema list; both live until
/// [`Decoder::reset`]. A single instance must not be shared across concurrent
/// tasks.
pub struct Decoder {
    buf: Bytes,
    simple: bool,
    refs: Vec<Option<Value>>,
    classes: Vec<Rc<ClassSchema>>,
}

impl Decoder {
    /// Creates a decoder with reference tracking enabled.
    pub fn new(buf: Bytes) -> Self {
        Decoder {
            buf,
            simple: false,
            refs: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Creates a decoder for streams known not to contain back-references.
    ///
    /// Reference bookkeeping is skipped entirely; a `ref` tag in the input is
    /// a format error. String and byte reads stay zero-copy slices of the
    /// input buffer.
    pub fn simple(buf: Bytes) -> Self {
        let mut dec = Self::new(buf);
        dec.simple = true;
        dec
    }

    /// True if this decoder was created with [`Decoder::simple`].
    pub fn is_simple(&self) -> bool {
        self.simple
    }

    /// Replaces the input and clears the reference and class schema lists.
    pub fn reset(&mut self, buf: Bytes) {
        self.buf = buf;
        self.refs.clear();
        self.classes.clear();
    }

    /// Decodes one value of type `T` from the stream.
    pub fn decode<T: Decode>(&mut self) -> Result<T> {
        T::decode(self)
    }

    /// Decodes one value through the process-wide registry by destination
    /// type id. An unregistered type falls back to structural decoding into a
    /// [`Value`].
    pub fn decode_any(&mut self, ty: std::any::TypeId) -> Result<Box<dyn std::any::Any>> {
        crate::registry::decode_any(self, ty)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    // --- wire primitives ---

    /// Reads the next tag byte.
    pub fn read_tag(&mut self) -> Result<u8> {
        if self.buf.is_empty() {
            return Err(CodecError::InsufficientData);
        }
        Ok(self.buf.get_u8())
    }

    /// Returns the next tag byte without consuming it.
    pub fn peek_tag(&self) -> Result<u8> {
        self.buf.first().copied().ok_or(CodecError::InsufficientData)
    }

    pub(crate) fn expect_tag(&mut self, expected: u8) -> Result<()> {
        let tag = self.read_tag()?;
        if tag != expected {
            return Err(CodecError::Format(format!(
                "expected '{}' (0x{:02x}), found '{}' (0x{:02x})",
                expected as char, expected, tag as char, tag
            )));
        }
        Ok(())
    }

    /// Consumes bytes up to and including `tag`, returning the bytes before
    /// it as a zero-copy slice.
    pub fn read_until(&mut self, tag: u8) -> Result<Bytes> {
        match self.buf.iter().position(|&b| b == tag) {
            Some(pos) => {
                let head = self.buf.split_to(pos);
                self.buf.advance(1);
                Ok(head)
            }
            None => Err(CodecError::InsufficientData),
        }
    }

    /// Takes exactly `n` bytes as a zero-copy slice.
    pub fn take(&mut self, n: usize) -> Result<Bytes> {
        if self.buf.len() < n {
            return Err(CodecError::InsufficientData);
        }
        Ok(self.buf.split_to(n))
    }

    /// ASCII decimal terminated by `until`; an empty literal reads as 0, the
    /// form counts and lengths take when omitted.
    pub(crate) fn read_len_until(&mut self, until: u8) -> Result<usize> {
        let bytes = self.read_until(until)?;
        if bytes.is_empty() {
            return Ok(0);
        }
        Ok(parse_u64(&bytes)? as usize)
    }

    /// Body of an `i`/`l` framed signed integer.
    pub(crate) fn read_i64_body(&mut self) -> Result<i64> {
        let bytes = self.read_until(TAG_SEMICOLON)?;
        parse_i64(&bytes)
    }

    /// Body of an `i`/`l` framed unsigned integer.
    pub(crate) fn read_u64_body(&mut self) -> Result<u64> {
        let bytes = self.read_until(TAG_SEMICOLON)?;
        parse_u64(&bytes)
    }

    /// Body of a `d` framed float.
    pub(crate) fn read_f64_body(&mut self) -> Result<f64> {
        let bytes = self.read_until(TAG_SEMICOLON)?;
        parse_f64(&bytes)
    }

    /// Sign byte following an `I` tag.
    pub(crate) fn read_infinity(&mut self) -> Result<f64> {
        match self.read_tag()? {
            TAG_POS => Ok(f64::INFINITY),
            TAG_NEG => Ok(f64::NEG_INFINITY),
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "infinity sign",
            }),
        }
    }

    /// One UTF-8 code point following a `u` tag.
    pub(crate) fn read_utf8_char(&mut self) -> Result<char> {
        let first = self.peek_tag()?;
        let width = if first < 0x80 {
            1
        } else if first & 0xe0 == 0xc0 {
            2
        } else if first & 0xf0 == 0xe0 {
            3
        } else if first & 0xf8 == 0xf0 {
            4
        } else {
            return Err(CodecError::Format(format!(
                "invalid UTF-8 lead byte 0x{:02x}",
                first
            )));
        };
        let bytes = self.take(width)?;
        let s = std::str::from_utf8(&bytes)
            .map_err(|_| CodecError::Format("invalid UTF-8 sequence".to_string()))?;
        s.chars()
            .next()
            .ok_or_else(|| CodecError::Format("empty UTF-8 sequence".to_string()))
    }

    /// Scans `units` UTF-16 code units worth of UTF-8 and returns them as a
    /// zero-copy slice. 1/2/3-byte sequences count one unit, 4-byte sequences
    /// two.
    pub(crate) fn read_string_body(&mut self, units: usize) -> Result<Bytes> {
        let mut i = 0usize;
        let mut u = 0usize;
        while u < units {
            let b = *self
                .buf
                .get(i)
                .ok_or(CodecError::InsufficientData)?;
            let (width, step) = if b < 0x80 {
                (1, 1)
            } else if b & 0xe0 == 0xc0 {
                (2, 1)
            } else if b & 0xf0 == 0xe0 {
                (3, 1)
            } else if b & 0xf8 == 0xf0 {
                (4, 2)
            } else {
                return Err(CodecError::Format(format!(
                    "invalid UTF-8 lead byte 0x{:02x} in string body",
                    b
                )));
            };
            i += width;
            u += step;
        }
        if u != units {
            return Err(CodecError::Format(
                "string length splits a surrogate pair".to_string(),
            ));
        }
        self.take(i)
    }

    /// Body of an `s` framed string (tag already consumed): length, quoted
    /// bytes, closing quote. The string is registered in the reference list.
    pub(crate) fn read_string_rc(&mut self) -> Result<Rc<str>> {
        let bytes = self.read_string_raw()?;
        let s = std::str::from_utf8(&bytes)
            .map_err(|_| CodecError::Format("string body is not valid UTF-8".to_string()))?;
        let rc: Rc<str> = Rc::from(s);
        self.push_reference(Value::Str(rc.clone()));
        Ok(rc)
    }

    /// Zero-copy body of an `s` framed string (tag already consumed). The
    /// returned slice shares the input buffer. The slot is still registered
    /// so later reference indices stay aligned.
    pub fn read_string_bytes(&mut self) -> Result<Bytes> {
        let bytes = self.read_string_raw()?;
        if !self.simple {
            let s = std::str::from_utf8(&bytes)
                .map_err(|_| CodecError::Format("string body is not valid UTF-8".to_string()))?;
            self.push_reference(Value::Str(Rc::from(s)));
        }
        Ok(bytes)
    }

    fn read_string_raw(&mut self) -> Result<Bytes> {
        let units = self.read_len_until(TAG_QUOTE)?;
        let bytes = self.read_string_body(units)?;
        self.expect_tag(TAG_QUOTE)?;
        Ok(bytes)
    }

    /// Body of a `b` framed byte array (tag already consumed), registered in
    /// the reference list. Zero-copy.
    pub(crate) fn read_bytes_framed(&mut self) -> Result<Bytes> {
        let count = self.read_len_until(TAG_QUOTE)?;
        let bytes = self.take(count)?;
        self.expect_tag(TAG_QUOTE)?;
        if !self.simple {
            self.push_reference(Value::Bytes(Rc::from(&bytes[..])));
        }
        Ok(bytes)
    }

    /// Like [`Decoder::read_bytes_framed`], but the returned allocation is
    /// the one registered in the reference list, preserving identity for
    /// [`Value`] graphs.
    pub(crate) fn read_bytes_rc(&mut self) -> Result<Rc<[u8]>> {
        let count = self.read_len_until(TAG_QUOTE)?;
        let bytes = self.take(count)?;
        self.expect_tag(TAG_QUOTE)?;
        let rc: Rc<[u8]> = Rc::from(&bytes[..]);
        self.push_reference(Value::Bytes(rc.clone()));
        Ok(rc)
    }

    // --- reference list ---

    /// Appends a materialized value to the reference list.
    pub(crate) fn push_reference(&mut self, value: Value) {
        if !self.simple {
            self.refs.push(Some(value));
        }
    }

    /// Reserves the next reference slot without retaining a value. Used by
    /// typed container decodes to keep the index stream aligned.
    pub(crate) fn reserve_reference(&mut self) {
        if !self.simple {
            self.refs.push(None);
        }
    }

    /// Resolves an `r` tag (already consumed): reads the index and returns
    /// the registered value.
    pub(crate) fn read_ref(&mut self) -> Result<Value> {
        let bytes = self.read_until(TAG_SEMICOLON)?;
        let index = parse_u64(&bytes)? as usize;
        if self.simple {
            return Err(CodecError::Format(
                "unexpected back-reference in simple stream".to_string(),
            ));
        }
        match self.refs.get(index) {
            None => Err(CodecError::RefOutOfRange {
                index,
                len: self.refs.len(),
            }),
            Some(None) => Err(CodecError::UnresolvedRef { index }),
            Some(Some(value)) => Ok(value.clone()),
        }
    }

    // --- class schemas ---

    /// Parses a class declaration (the `c` tag already consumed) and appends
    /// its schema. Field names are string values and consume reference slots;
    /// the declaration itself yields no value.
    pub(crate) fn read_class(&mut self) -> Result<()> {
        let units = self.read_len_until(TAG_QUOTE)?;
        let name_bytes = self.read_string_body(units)?;
        self.expect_tag(TAG_QUOTE)?;
        let name = std::str::from_utf8(&name_bytes)
            .map_err(|_| CodecError::Format("class name is not valid UTF-8".to_string()))?
            .to_string();
        let count = self.read_len_until(TAG_OPENBRACE)?;
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = self.read_tag()?;
            if tag != TAG_STRING {
                return Err(CodecError::TagMismatch {
                    tag,
                    expected: "class field name",
                });
            }
            fields.push(self.read_string_rc()?);
        }
        self.expect_tag(TAG_CLOSEBRACE)?;
        self.classes.push(Rc::new(ClassSchema { name, fields }));
        Ok(())
    }

    /// The schema declared at `index`.
    pub(crate) fn class_schema(&self, index: usize) -> Result<Rc<ClassSchema>> {
        self.classes
            .get(index)
            .cloned()
            .ok_or(CodecError::UnknownClass {
                index,
                len: self.classes.len(),
            })
    }
}
