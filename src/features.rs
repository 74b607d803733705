//! Feature-gated codecs: big numerics, complex numbers and UUIDs.

#[cfg(feature = "bignum")]
use bigdecimal::BigDecimal;
#[cfg(feature = "bignum")]
use num_bigint::BigInt;
#[cfg(feature = "complex")]
use num_complex::Complex;
#[cfg(feature = "bignum")]
use num_rational::BigRational;
#[cfg(feature = "bignum")]
use num_traits::{One, Zero};
#[cfg(feature = "bignum")]
use std::str::FromStr;
#[cfg(feature = "uuid")]
use uuid::Uuid;

#[allow(unused_imports)]
use crate::tags::*;
#[allow(unused_imports)]
use crate::value::Value;
#[allow(unused_imports)]
use crate::{CodecError, Decode, Decoder, Encode, Encoder, RefKey, Result};

// --- BigInt ---

#[cfg(feature = "bignum")]
fn parse_bigint(bytes: &[u8]) -> Result<BigInt> {
    BigInt::parse_bytes(bytes, 10).ok_or_else(|| {
        CodecError::Format(format!(
            "bad integer literal {:?}",
            String::from_utf8_lossy(bytes)
        ))
    })
}

/// Truncates toward zero. `BigDecimal` has no direct truncation, so this
/// splits the unscaled integer and shifts by the exponent.
#[cfg(feature = "bignum")]
fn bigdecimal_trunc(d: &BigDecimal) -> BigInt {
    let (mantissa, exponent) = d.as_bigint_and_exponent();
    if exponent <= 0 {
        mantissa * BigInt::from(10u8).pow((-exponent) as u32)
    } else {
        mantissa / BigInt::from(10u8).pow(exponent as u32)
    }
}

/// Arbitrary-precision integers always frame as `l<decimal>;` regardless of
/// magnitude. They are not referenceable.
#[cfg(feature = "bignum")]
impl Encode for BigInt {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.put_u8(TAG_LONG);
        enc.put_slice(self.to_string().as_bytes());
        enc.put_u8(TAG_SEMICOLON);
        Ok(())
    }
}

#[cfg(feature = "bignum")]
impl Decode for BigInt {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        if let Some(d) = digit_value(tag) {
            return Ok(BigInt::from(d));
        }
        match tag {
            TAG_NULL | TAG_EMPTY | TAG_FALSE => Ok(BigInt::zero()),
            TAG_TRUE => Ok(BigInt::one()),
            TAG_INTEGER => Ok(BigInt::from(dec.read_i64_body()?)),
            TAG_LONG => {
                let bytes = dec.read_until(TAG_SEMICOLON)?;
                parse_bigint(&bytes)
            }
            TAG_DOUBLE => {
                let bytes = dec.read_until(TAG_SEMICOLON)?;
                let text = std::str::from_utf8(&bytes)
                    .map_err(|_| CodecError::Format("invalid UTF-8 in number body".to_string()))?;
                let d = BigDecimal::from_str(text)
                    .map_err(|e| CodecError::Format(format!("bad float literal {:?}: {}", text, e)))?;
                Ok(bigdecimal_trunc(&d))
            }
            TAG_UTF8_CHAR => {
                let c = dec.read_utf8_char()?;
                parse_bigint(c.to_string().as_bytes())
            }
            TAG_STRING => {
                let s = dec.read_string_rc()?;
                parse_bigint(s.as_bytes())
            }
            TAG_REF => match dec.read_ref()? {
                Value::Str(s) => parse_bigint(s.as_bytes()),
                Value::BigInt(b) => Ok(b),
                _ => Err(CodecError::Format(
                    "referenced value is not a number".to_string(),
                )),
            },
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "BigInt",
            }),
        }
    }
}

// --- BigDecimal ---

/// Arbitrary-precision floats frame as `d<decimal>;`, like `f64` but with
/// the full digit string.
#[cfg(feature = "bignum")]
impl Encode for BigDecimal {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.put_u8(TAG_DOUBLE);
        enc.put_slice(self.to_string().as_bytes());
        enc.put_u8(TAG_SEMICOLON);
        Ok(())
    }
}

#[cfg(feature = "bignum")]
impl Decode for BigDecimal {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        fn parse(text: &str) -> Result<BigDecimal> {
            BigDecimal::from_str(text)
                .map_err(|e| CodecError::Format(format!("bad decimal literal {:?}: {}", text, e)))
        }
        if let Some(d) = digit_value(tag) {
            return Ok(BigDecimal::from(d));
        }
        match tag {
            TAG_NULL | TAG_EMPTY | TAG_FALSE => Ok(BigDecimal::zero()),
            TAG_TRUE => Ok(BigDecimal::one()),
            TAG_INTEGER => Ok(BigDecimal::from(dec.read_i64_body()?)),
            TAG_LONG | TAG_DOUBLE => {
                let bytes = dec.read_until(TAG_SEMICOLON)?;
                let text = std::str::from_utf8(&bytes)
                    .map_err(|_| CodecError::Format("invalid UTF-8 in number body".to_string()))?;
                parse(text)
            }
            TAG_NAN => Err(CodecError::Format(
                "NaN is not representable as BigDecimal".to_string(),
            )),
            TAG_INFINITY => {
                dec.read_infinity()?;
                Err(CodecError::Format(
                    "infinity is not representable as BigDecimal".to_string(),
                ))
            }
            TAG_UTF8_CHAR => {
                let c = dec.read_utf8_char()?;
                parse(&c.to_string())
            }
            TAG_STRING => {
                let s = dec.read_string_rc()?;
                parse(&s)
            }
            TAG_REF => match dec.read_ref()? {
                Value::Str(s) => parse(&s),
                _ => Err(CodecError::Format(
                    "referenced value is not a number".to_string(),
                )),
            },
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "BigDecimal",
            }),
        }
    }
}

// --- BigRational ---

/// Integer-valued rationals canonicalize to the `l` form. Every other
/// rational is the canonical `numer/denom` string, consuming one counter
/// slot: passed by value, it has no address and can never be
/// back-referenced.
#[cfg(feature = "bignum")]
impl Encode for BigRational {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        if self.is_integer() {
            enc.put_u8(TAG_LONG);
            enc.put_slice(self.to_integer().to_string().as_bytes());
            enc.put_u8(TAG_SEMICOLON);
            return Ok(());
        }
        enc.add_reference_count(1);
        let text = self.to_string();
        let len = text.len();
        enc.write_str_raw(&text, len)
    }
}

#[cfg(feature = "bignum")]
impl Decode for BigRational {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        fn parse(text: &str) -> Result<BigRational> {
            BigRational::from_str(text)
                .map_err(|e| CodecError::Format(format!("bad rational literal {:?}: {}", text, e)))
        }
        if let Some(d) = digit_value(tag) {
            return Ok(BigRational::from_integer(BigInt::from(d)));
        }
        match tag {
            TAG_NULL | TAG_EMPTY | TAG_FALSE => Ok(BigRational::zero()),
            TAG_TRUE => Ok(BigRational::one()),
            TAG_INTEGER => Ok(BigRational::from_integer(BigInt::from(dec.read_i64_body()?))),
            TAG_LONG => {
                let bytes = dec.read_until(TAG_SEMICOLON)?;
                Ok(BigRational::from_integer(parse_bigint(&bytes)?))
            }
            TAG_DOUBLE => {
                let f = dec.read_f64_body()?;
                BigRational::from_float(f).ok_or_else(|| {
                    CodecError::Format(format!("float {} has no exact rational form", f))
                })
            }
            TAG_UTF8_CHAR => {
                let c = dec.read_utf8_char()?;
                parse(&c.to_string())
            }
            TAG_STRING => {
                let s = dec.read_string_rc()?;
                parse(&s)
            }
            TAG_REF => match dec.read_ref()? {
                Value::Str(s) => parse(&s),
                _ => Err(CodecError::Format(
                    "referenced value is not a number".to_string(),
                )),
            },
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "BigRational",
            }),
        }
    }
}

// --- complex ---

#[cfg(feature = "complex")]
fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Double(f) => Some(*f),
        _ => None,
    }
}

/// A complex with zero imaginary part is just its real float; otherwise a
/// two-element list of floats consuming one counter slot.
#[cfg(feature = "complex")]
impl Encode for Complex<f64> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        if self.im == 0.0 {
            return enc.write_f64(self.re);
        }
        enc.add_reference_count(1);
        enc.write_head(TAG_LIST, 2)?;
        enc.write_f64(self.re)?;
        enc.write_f64(self.im)?;
        enc.write_foot()
    }
}

#[cfg(feature = "complex")]
impl Decode for Complex<f64> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        match tag {
            TAG_LIST => {
                let count = dec.read_len_until(TAG_OPENBRACE)?;
                if count != 2 {
                    return Err(CodecError::Format(format!(
                        "complex expects a 2-element list, found {}",
                        count
                    )));
                }
                dec.reserve_reference();
                let re = f64::decode(dec)?;
                let im = f64::decode(dec)?;
                dec.expect_tag(TAG_CLOSEBRACE)?;
                Ok(Complex::new(re, im))
            }
            TAG_REF => match dec.read_ref()? {
                Value::List(list) => {
                    let items = list.borrow();
                    match (items.first().and_then(value_to_f64), items.get(1).and_then(value_to_f64), items.len()) {
                        (Some(re), Some(im), 2) => Ok(Complex::new(re, im)),
                        _ => Err(CodecError::Format(
                            "referenced list is not a float pair".to_string(),
                        )),
                    }
                }
                _ => Err(CodecError::Format(
                    "referenced value is not a complex".to_string(),
                )),
            },
            tag => Ok(Complex::new(
                crate::core::read_f64_tag(dec, tag, "Complex<f64>")?,
                0.0,
            )),
        }
    }
}

#[cfg(feature = "complex")]
impl Encode for Complex<f32> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        if self.im == 0.0 {
            return enc.write_f32(self.re);
        }
        enc.add_reference_count(1);
        enc.write_head(TAG_LIST, 2)?;
        enc.write_f32(self.re)?;
        enc.write_f32(self.im)?;
        enc.write_foot()
    }
}

#[cfg(feature = "complex")]
impl Decode for Complex<f32> {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        let c = Complex::<f64>::decode_tag(dec, tag)?;
        Ok(Complex::new(c.re as f32, c.im as f32))
    }
}

// --- UUID ---

/// UUIDs frame as `g{8-4-4-4-12}` lowercase hex and are referenceable by
/// the address they are encoded from.
#[cfg(feature = "uuid")]
impl Encode for Uuid {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        if enc.write_reference(RefKey::of_ref(self))? {
            return Ok(());
        }
        self.write(enc)
    }

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.set_reference(RefKey::of_ref(self));
        let mut buf = [0u8; 36];
        self.hyphenated().encode_lower(&mut buf);
        enc.put_u8(TAG_GUID);
        enc.put_u8(TAG_OPENBRACE);
        enc.put_slice(&buf);
        enc.put_u8(TAG_CLOSEBRACE);
        Ok(())
    }
}

#[cfg(feature = "uuid")]
impl Decode for Uuid {
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self> {
        fn parse(text: &str) -> Result<Uuid> {
            Uuid::parse_str(text)
                .map_err(|e| CodecError::Format(format!("bad UUID literal {:?}: {}", text, e)))
        }
        match tag {
            TAG_GUID => {
                dec.expect_tag(TAG_OPENBRACE)?;
                let text = dec.take(36)?;
                dec.expect_tag(TAG_CLOSEBRACE)?;
                let id = Uuid::try_parse_ascii(&text)
                    .map_err(|e| CodecError::Format(format!("bad UUID literal: {}", e)))?;
                dec.push_reference(Value::Uuid(id));
                Ok(id)
            }
            TAG_STRING => {
                let s = dec.read_string_rc()?;
                parse(&s)
            }
            TAG_BYTES => {
                let bytes = dec.read_bytes_framed()?;
                Uuid::from_slice(&bytes).map_err(|e| {
                    CodecError::Format(format!("bad UUID byte array ({} bytes): {}", bytes.len(), e))
                })
            }
            TAG_REF => match dec.read_ref()? {
                Value::Uuid(id) => Ok(id),
                Value::Str(s) => parse(&s),
                Value::Bytes(b) => Uuid::from_slice(&b[..]).map_err(|e| {
                    CodecError::Format(format!("bad UUID byte array ({} bytes): {}", b.len(), e))
                }),
                _ => Err(CodecError::Format(
                    "referenced value is not a UUID".to_string(),
                )),
            },
            tag => Err(CodecError::TagMismatch {
                tag,
                expected: "Uuid",
            }),
        }
    }
}
