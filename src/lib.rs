//! # graphpack
//!
//! A self-describing, reference-preserving binary serialization format for
//! value graphs.
//!
//! - Tag-driven wire grammar with ASCII-decimal numbers and UTF-16 code-unit
//!   string length prefixes
//! - De-duplicates repeated strings, byte arrays, lists, maps and records
//!   through a per-stream reference table, so shared and cyclic graphs
//!   round-trip with their sharing intact
//! - Typed encoding/decoding through the [`Encode`]/[`Decode`] traits, plus a
//!   dynamic [`Value`] tree for schemaless streams
//! - Records (named structs) are declared once per stream as a class and
//!   thereafter carried as field values only
//! - Feature-gated support for big numerics (`num-bigint`, `num-rational`,
//!   `bigdecimal`), complex numbers (`num-complex`) and `uuid`
//!
//! ## Feature flags
//!
//! - `bignum` (default) — `BigInt`, `BigDecimal` and `BigRational` codecs,
//!   including the cross-tag coercions the format defines for them.
//! - `complex` (default) — `Complex<f32>`/`Complex<f64>` codecs.
//! - `uuid` (default) — `uuid::Uuid` codec.
//!
//! ## Example
//! ```rust
//! use graphpack::{Encode, Decode};
//!
//! #[derive(Encode, Decode, PartialEq, Debug)]
//! struct Account {
//!     id: u32,
//!     name: String,
//! }
//!
//! let value = Account { id: 42, name: "hello".to_string() };
//! let buf = graphpack::encode(&value).unwrap();
//! let decoded: Account = graphpack::decode(buf).unwrap();
//! assert_eq!(value, decoded);
//! ```
//!
//! ## Simple mode
//!
//! [`Encoder::simple`] and [`Decoder::simple`] disable reference tracking for
//! streams known not to contain back-references. On the decode side this also
//! unlocks zero-copy reads: `Bytes` destinations and
//! [`Decoder::read_string_bytes`] return ref-counted slices of the input
//! buffer instead of copies.

pub mod core;
pub mod decoder;
pub mod encoder;
mod features;
pub mod record;
pub mod registry;
pub mod tags;
pub mod value;

use bytes::Bytes;
pub use graphpack_derive::{Decode, Encode};
use thiserror::Error;

pub use crate::decoder::{ClassSchema, Decoder};
pub use crate::encoder::{Encoder, RefKey};
pub use crate::registry::{register, unregister};
pub use crate::value::Value;

/// Error type for all encoding and decoding operations in this crate.
///
/// Errors are fatal for the value being processed and surface to the
/// top-level caller; the codec performs no retries. On decode the input
/// cursor is left just past the offending bytes.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The next tag cannot satisfy the requested destination type.
    #[error("cannot decode {expected} from tag {}", tag_display(.tag))]
    TagMismatch { tag: u8, expected: &'static str },
    /// Malformed input: bad numeric literal, ill-formed UTF-8 where a string
    /// was expected, unterminated framing.
    #[error("malformed value: {0}")]
    Format(String),
    /// A `ref` index exceeds the current reference table length.
    #[error("reference index {index} out of range (table has {len})")]
    RefOutOfRange { index: usize, len: usize },
    /// A `ref` index points at a slot whose value was consumed by a typed
    /// container decode and not retained. The dynamic [`Value`] path retains
    /// every slot.
    #[error("reference index {index} was not materialized by this decode")]
    UnresolvedRef { index: usize },
    /// No codec was registered for the runtime type of an `encode_any` value.
    #[error("no codec registered for {0}")]
    Unregistered(String),
    /// An object instance referenced a class index that was never declared.
    #[error("object references undeclared class index {index} (stream declared {len})")]
    UnknownClass { index: usize, len: usize },
    /// A declared class schema does not line up with the destination record.
    #[error("class '{class}' does not match destination record: {detail}")]
    ClassMismatch { class: String, detail: String },
    /// The buffer did not contain enough data to complete the operation.
    #[error("insufficient data in buffer")]
    InsufficientData,
}

fn tag_display(tag: &u8) -> String {
    format!("'{}' (0x{:02x})", *tag as char, tag)
}

/// The result type used throughout this crate for encode/decode operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Trait for types that can be encoded into the graphpack wire format.
///
/// Most users should use `#[derive(Encode)]` for records or rely on the
/// built-in implementations; manual implementations are only needed for
/// custom wire behavior.
pub trait Encode {
    /// Encode the value, emitting a back-reference if an identical value was
    /// already written to this stream.
    fn encode(&self, enc: &mut Encoder) -> Result<()>;

    /// Serialize the value unconditionally, registering it in the reference
    /// table before any child value is written.
    ///
    /// Primitives that are never referenceable leave this as the default,
    /// which forwards to [`Encode::encode`].
    fn write(&self, enc: &mut Encoder) -> Result<()> {
        self.encode(enc)
    }
}

/// Trait for types that can be decoded from the graphpack wire format.
pub trait Decode: Sized {
    /// Decode a value whose introducing tag has already been read.
    fn decode_tag(dec: &mut Decoder, tag: u8) -> Result<Self>;

    /// Read the next tag and decode a value from it.
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let tag = dec.read_tag()?;
        Self::decode_tag(dec, tag)
    }
}

/// Encodes a value to bytes with reference tracking.
///
/// ```rust
/// let buf = graphpack::encode(&vec![1u32, 2, 3]).unwrap();
/// let decoded: Vec<u32> = graphpack::decode(buf).unwrap();
/// assert_eq!(decoded, vec![1, 2, 3]);
/// ```
pub fn encode<T: Encode + ?Sized>(value: &T) -> Result<Bytes> {
    let mut enc = Encoder::new();
    enc.encode(value)?;
    Ok(enc.finish())
}

/// Encodes a value to bytes without reference tracking.
///
/// Every composite is written in full; the stream contains no `ref` tags and
/// can be decoded by a [`Decoder::simple`].
pub fn encode_simple<T: Encode + ?Sized>(value: &T) -> Result<Bytes> {
    let mut enc = Encoder::simple();
    enc.encode(value)?;
    Ok(enc.finish())
}

/// Decodes a value from bytes.
pub fn decode<T: Decode>(buf: impl Into<Bytes>) -> Result<T> {
    Decoder::new(buf.into()).decode()
}

/// Decodes a value from a stream known not to contain back-references.
///
/// Skips reference bookkeeping; a `ref` tag in the input is an error.
pub fn decode_simple<T: Decode>(buf: impl Into<Bytes>) -> Result<T> {
    Decoder::simple(buf.into()).decode()
}
